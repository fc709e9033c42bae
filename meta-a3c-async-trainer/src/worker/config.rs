use anyhow::Result;
use meta_a3c_core::{intrinsic::RewardShaper, returns::ReturnEstimator, LossWeights};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Worker`](crate::Worker).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct WorkerConfig {
    /// Discount factor of both levels.
    pub gamma: f32,

    /// Parameter of generalized advantage estimation of both levels.
    pub lambda: f32,

    /// Weight of the environment reward in the shaped reward.
    pub beta: f32,

    /// Scale of the intrinsic reward.
    pub intrinsic_scale: f32,

    /// Added to the denominator of the selectivity.
    pub eps: f32,

    /// Environment rewards are clipped to `[-reward_clip, reward_clip]`.
    pub reward_clip: f32,

    /// The maximum number of transitions of a sub-level rollout.
    pub sub_horizon: usize,

    /// The maximum number of transitions of a meta-level rollout.
    pub meta_horizon: usize,

    /// The number of sub-level rollouts per meta-level step.
    pub sub_loops_per_meta_step: usize,

    /// The number of meta-level rollouts between target synchronizations.
    pub meta_loops_per_target_sync: usize,

    /// Coefficient of the value loss.
    pub value_coef: f32,

    /// Coefficient of the entropy bonus.
    pub entropy_coef: f32,

    /// Gradients are clipped to this global norm.
    pub max_grad_norm: f32,

    /// Interval of training summaries in sub-level updates.
    pub summary_interval: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            lambda: 1.0,
            beta: 0.75,
            intrinsic_scale: 0.05,
            eps: 1e-5,
            reward_clip: 1.0,
            sub_horizon: 100,
            meta_horizon: 20,
            sub_loops_per_meta_step: 1,
            meta_loops_per_target_sync: 5,
            value_coef: 0.5,
            entropy_coef: 0.01,
            max_grad_norm: 40.0,
            summary_interval: 11,
        }
    }
}

impl WorkerConfig {
    /// Constructs [`WorkerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`WorkerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the weight of the environment reward.
    pub fn beta(mut self, v: f32) -> Self {
        self.beta = v;
        self
    }

    /// Sets the horizon of sub-level rollouts.
    pub fn sub_horizon(mut self, v: usize) -> Self {
        self.sub_horizon = v;
        self
    }

    /// Sets the horizon of meta-level rollouts.
    pub fn meta_horizon(mut self, v: usize) -> Self {
        self.meta_horizon = v;
        self
    }

    /// Sets the number of sub-level rollouts per meta-level step.
    pub fn sub_loops_per_meta_step(mut self, v: usize) -> Self {
        self.sub_loops_per_meta_step = v;
        self
    }

    /// Sets the number of meta-level rollouts between target synchronizations.
    pub fn meta_loops_per_target_sync(mut self, v: usize) -> Self {
        self.meta_loops_per_target_sync = v;
        self
    }

    /// Sets the maximum global norm of gradients.
    pub fn max_grad_norm(mut self, v: f32) -> Self {
        self.max_grad_norm = v;
        self
    }

    /// Sets the interval of training summaries.
    pub fn summary_interval(mut self, v: usize) -> Self {
        self.summary_interval = v;
        self
    }

    pub(crate) fn estimator(&self) -> ReturnEstimator {
        ReturnEstimator::new(self.gamma, self.lambda)
    }

    pub(crate) fn shaper(&self) -> RewardShaper {
        RewardShaper {
            beta: self.beta,
            clip: self.reward_clip,
        }
    }

    pub(crate) fn loss_weights(&self) -> LossWeights {
        LossWeights {
            value_coef: self.value_coef,
            entropy_coef: self.entropy_coef,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_yaml_round_trip() -> Result<()> {
        let tmp = TempDir::new("worker_config")?;
        let path = tmp.path().join("worker.yaml");
        let config = WorkerConfig::default().sub_horizon(5).summary_interval(1);
        config.save(&path)?;
        assert_eq!(WorkerConfig::load(&path)?, config);
        Ok(())
    }
}
