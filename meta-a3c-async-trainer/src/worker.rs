//! Workers running both levels of the hierarchy on a single environment.
mod base;
mod config;
mod meta_controller;
mod stat;
mod sub_controller;
pub use base::Worker;
pub use config::WorkerConfig;
pub use meta_controller::{MetaController, MetaOutcome};
pub use stat::{actor_stats_fmt, ActorStat};
pub use sub_controller::{SubController, SubOutcome};
