//! Environment step.
use super::Env;
use crate::record::Record;

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
pub struct Step<E: Env> {
    /// Observation after the action.
    pub obs: E::Obs,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if the episode is terminated.
    pub is_terminated: bool,

    /// Diagnostic information reported by the environment.
    pub info: Record,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(obs: E::Obs, reward: f32, is_terminated: bool, info: Record) -> Self {
        Step {
            obs,
            reward,
            is_terminated,
            info,
        }
    }
}
