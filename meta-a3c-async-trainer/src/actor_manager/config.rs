use serde::{Deserialize, Serialize};

/// Configuration of [ActorManager](super::ActorManager).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActorManagerConfig {
    /// The environment of worker `i` is built with seed `env_seed_offset + i`.
    ///
    /// The default value is 0.
    pub env_seed_offset: i64,
}

impl Default for ActorManagerConfig {
    fn default() -> Self {
        Self { env_seed_offset: 0 }
    }
}
