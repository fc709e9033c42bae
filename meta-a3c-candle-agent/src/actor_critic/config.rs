//! Configuration of [`RecurrentActorCritic`](super::RecurrentActorCritic).
use crate::Device;
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`RecurrentActorCritic`](super::RecurrentActorCritic).
///
/// The input of the LSTM cell at each step is the concatenation of the
/// features of the observation, the previous action (one-hot), the previous
/// reward and the option (`context_dim` values, zero for the meta policy).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RecurrentActorCriticConfig {
    /// Length of an observation vector.
    pub obs_dim: usize,

    /// Hidden layer sizes of the feature network.
    pub feature_units: Vec<usize>,

    /// Length of the feature vector.
    ///
    /// For the sub policy it must equal the number of options.
    pub feature_dim: usize,

    /// Size of the hidden state of the LSTM cell.
    pub lstm_dim: usize,

    /// The number of discrete actions.
    pub n_actions: usize,

    /// Length of the option vector the policy is conditioned on.
    pub context_dim: usize,

    /// Seed of the action sampler.
    pub seed: u64,

    /// Device used for the networks.
    pub device: Option<Device>,
}

impl Default for RecurrentActorCriticConfig {
    fn default() -> Self {
        Self {
            obs_dim: 1,
            feature_units: vec![64],
            feature_dim: 8,
            lstm_dim: 64,
            n_actions: 2,
            context_dim: 0,
            seed: 42,
            device: None,
        }
    }
}

impl RecurrentActorCriticConfig {
    /// Sets the length of an observation vector.
    pub fn obs_dim(mut self, v: usize) -> Self {
        self.obs_dim = v;
        self
    }

    /// Sets the hidden layer sizes of the feature network.
    pub fn feature_units(mut self, v: Vec<usize>) -> Self {
        self.feature_units = v;
        self
    }

    /// Sets the length of the feature vector.
    pub fn feature_dim(mut self, v: usize) -> Self {
        self.feature_dim = v;
        self
    }

    /// Sets the size of the LSTM state.
    pub fn lstm_dim(mut self, v: usize) -> Self {
        self.lstm_dim = v;
        self
    }

    /// Sets the number of actions.
    pub fn n_actions(mut self, v: usize) -> Self {
        self.n_actions = v;
        self
    }

    /// Sets the length of the option vector.
    pub fn context_dim(mut self, v: usize) -> Self {
        self.context_dim = v;
        self
    }

    /// Sets the seed of the action sampler.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Length of the input of the LSTM cell.
    pub fn lstm_in_dim(&self) -> usize {
        self.feature_dim + self.n_actions + 1 + self.context_dim
    }

    /// Saves the configuration to YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of recurrent actor-critic into {:?}", path_);
        Ok(())
    }

    /// Constructs the configuration from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of recurrent actor-critic from {:?}", path_);
        Ok(b)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_config() -> Result<()> {
        let config = RecurrentActorCriticConfig::default()
            .obs_dim(16)
            .feature_units(vec![32, 32])
            .feature_dim(4)
            .context_dim(4)
            .device(Device::Cpu);
        assert_eq!(config.lstm_in_dim(), 4 + 2 + 1 + 4);

        let dir = TempDir::new("actor_critic_config")?;
        let path = dir.path().join("config.yaml");
        config.save(&path)?;
        assert_eq!(RecurrentActorCriticConfig::load(&path)?, config);
        Ok(())
    }
}
