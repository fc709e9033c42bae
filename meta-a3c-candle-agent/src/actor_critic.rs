//! Recurrent actor-critic with a feature network, an LSTM cell and
//! policy/value heads.
mod base;
mod config;
pub use base::{LstmState, RecurrentActorCritic, FEATURE_PREFIX};
pub use config::RecurrentActorCriticConfig;
