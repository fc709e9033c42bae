//! Recurrent actor-critic built with [candle](https://crates.io/crates/candle-core).
//!
//! [`RecurrentActorCritic`] implements the policy traits of `meta-a3c-core`
//! for both levels of the hierarchy, and [`Optimizer`] turns flat gradients
//! into additive parameter updates with candle optimizers.
pub mod actor_critic;
pub mod mlp;
pub mod opt;
pub mod util;
use serde::{Deserialize, Serialize};

pub use actor_critic::{LstmState, RecurrentActorCritic, RecurrentActorCriticConfig};
pub use opt::{Optimizer, OptimizerConfig};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    #[default]
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl TryFrom<Device> for candle_core::Device {
    type Error = candle_core::Error;

    fn try_from(device: Device) -> Result<Self, Self::Error> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => candle_core::Device::new_cuda(n),
        }
    }
}
