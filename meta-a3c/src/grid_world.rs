//! Navigation in a 2D grid.
//!
//! * Observation: one-hot position of the agent followed by one-hot position
//!   of the goal, `2 * width * height` values.
//! * Actions: 0 = up, 1 = down, 2 = left, 3 = right. Moves into a wall leave
//!   the agent in place.
//! * Reward: `goal_reward` when the goal is reached, which terminates the
//!   episode, `step_reward` otherwise.
mod base;
mod config;
pub use base::GridWorld;
pub use config::GridWorldConfig;
