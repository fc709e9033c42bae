//! Environment.
use super::Step;
use anyhow::Result;

/// Represents an environment, typically an MDP.
///
/// Actions are given as the index of a discrete action. Controllers convert
/// the output of the policy to an index before calling [`Env::step`].
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Clone;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Resets the environment and returns the first observation of an episode.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Performes an environment step.
    fn step(&mut self, action: usize) -> Result<Step<Self>>
    where
        Self: Sized;

    /// The number of discrete actions.
    fn n_actions(&self) -> usize;

    /// The maximum number of steps in an episode.
    ///
    /// Controllers refuse environments returning `None`.
    fn max_episode_steps(&self) -> Option<usize>;

    /// Returns `true` if the environment resets itself at the end of an episode.
    fn autoreset(&self) -> bool {
        false
    }

    /// Renders the current state of the environment.
    fn render(&mut self) -> Result<()> {
        Ok(())
    }
}
