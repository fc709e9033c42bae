use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Evaluator`](crate::Evaluator).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EvaluatorConfig {
    /// The number of episodes in an evaluation.
    pub n_episodes: usize,

    /// Renders the environment at every step.
    pub render: bool,

    /// Random seed of the environment.
    pub env_seed: i64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            n_episodes: 100,
            render: false,
            env_seed: 0,
        }
    }
}

impl EvaluatorConfig {
    /// Constructs [`EvaluatorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`EvaluatorConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Sets the number of episodes.
    pub fn n_episodes(mut self, v: usize) -> Self {
        self.n_episodes = v;
        self
    }

    /// Sets the rendering flag.
    pub fn render(mut self, v: bool) -> Self {
        self.render = v;
        self
    }
}
