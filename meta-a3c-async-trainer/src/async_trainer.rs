//! Receives records from workers, evaluates and saves the shared parameters.
mod base;
mod config;
mod stat;
pub use base::AsyncTrainer;
pub use config::AsyncTrainerConfig;
pub use stat::AsyncTrainStat;
