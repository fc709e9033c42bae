use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`GridWorld`](super::GridWorld).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GridWorldConfig {
    /// Width of the grid.
    pub width: usize,

    /// Height of the grid.
    pub height: usize,

    /// Goal position `(x, y)`, used unless `random_goal` is `true`.
    pub goal: (usize, usize),

    /// Draw the goal at random on every reset.
    pub random_goal: bool,

    /// Draw the start position at random on every reset, otherwise start at `(0, 0)`.
    pub random_start: bool,

    /// Reward for reaching the goal.
    pub goal_reward: f32,

    /// Reward of the other steps.
    pub step_reward: f32,

    /// Episode step limit.
    pub max_steps: usize,
}

impl Default for GridWorldConfig {
    fn default() -> Self {
        Self {
            width: 5,
            height: 5,
            goal: (4, 4),
            random_goal: false,
            random_start: false,
            goal_reward: 1.0,
            step_reward: -0.01,
            max_steps: 100,
        }
    }
}

impl GridWorldConfig {
    /// Sets the size of the grid and puts the goal at the far corner.
    pub fn size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self.goal = (width.saturating_sub(1), height.saturating_sub(1));
        self
    }

    /// Sets the goal position.
    pub fn goal(mut self, x: usize, y: usize) -> Self {
        self.goal = (x, y);
        self
    }

    /// Draws the goal at random on every reset.
    pub fn random_goal(mut self, v: bool) -> Self {
        self.random_goal = v;
        self
    }

    /// Draws the start position at random on every reset.
    pub fn random_start(mut self, v: bool) -> Self {
        self.random_start = v;
        self
    }

    /// Sets the reward of the steps not reaching the goal.
    pub fn step_reward(mut self, v: f32) -> Self {
        self.step_reward = v;
        self
    }

    /// Sets the episode step limit.
    pub fn max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }

    /// Length of an observation vector.
    pub fn obs_dim(&self) -> usize {
        2 * self.width * self.height
    }

    /// Constructs [`GridWorldConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of grid world from {:?}", path_);
        Ok(b)
    }

    /// Saves [`GridWorldConfig`] to YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of grid world into {:?}", path_);
        Ok(())
    }
}
