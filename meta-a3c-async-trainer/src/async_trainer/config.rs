use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`AsyncTrainer`](crate::AsyncTrainer).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AsyncTrainerConfig {
    /// Training stops when the global step reaches this value.
    pub max_global_steps: u64,

    /// Where to save the parameters.
    pub model_dir: Option<String>,

    /// Interval of evaluation in global steps. Zero disables evaluation.
    pub eval_interval: u64,

    /// Interval of saving the parameters in global steps. Zero disables saving.
    pub save_interval: u64,

    /// Timeout of waiting for a record from workers in milliseconds.
    pub record_poll_timeout_ms: u64,
}

impl AsyncTrainerConfig {
    /// Constructs [AsyncTrainerConfig] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [AsyncTrainerConfig].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Sets the directory the parameters being saved.
    pub fn model_dir<T: Into<String>>(mut self, model_dir: T) -> Self {
        self.model_dir = Some(model_dir.into());
        self
    }

    /// Sets the maximum global step.
    pub fn max_global_steps(mut self, v: u64) -> Self {
        self.max_global_steps = v;
        self
    }

    /// Sets the interval of evaluation.
    pub fn eval_interval(mut self, v: u64) -> Self {
        self.eval_interval = v;
        self
    }

    /// Sets the interval of saving the parameters.
    pub fn save_interval(mut self, v: u64) -> Self {
        self.save_interval = v;
        self
    }
}

impl Default for AsyncTrainerConfig {
    fn default() -> Self {
        Self {
            max_global_steps: 10_000_000,
            model_dir: None,
            eval_interval: 1_000_000,
            save_interval: 1_000_000,
            record_poll_timeout_ms: 100,
        }
    }
}
