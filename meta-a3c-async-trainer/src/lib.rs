#![warn(missing_docs)]
//! Asynchronous trainer of hierarchical actor-critic.
//!
//! Each [`Worker`] owns an environment, a sub policy and a meta policy, and
//! updates parameters shared by all workers without locking (Hogwild):
//!
//! * [`SubController`] pulls the shared sub parameters, takes at most
//!   `sub_horizon` primitive actions under an option, and pushes a gradient
//!   update. Its reward blends the clipped environment reward with an
//!   intrinsic reward for changing the feature selected by the option.
//! * [`MetaController`] pulls the shared meta parameters, selects at most
//!   `meta_horizon` options, runs the sub controller under each of them and
//!   pushes a gradient update computed from the environment rewards.
//! * [`Worker::process`] copies the feature network of the shared sub
//!   parameters to the shared target feature network, used to compute the
//!   intrinsic reward, and then runs the meta controller.
//!
//! [`ActorManager`] runs workers on threads and [`AsyncTrainer`] writes the
//! records they send, evaluates and saves the shared parameters.
mod actor_manager;
mod async_trainer;
mod evaluator;
mod messages;
mod parameter_store;
pub mod util;
mod worker;
pub use actor_manager::{ActorManager, ActorManagerConfig};
pub use async_trainer::{AsyncTrainStat, AsyncTrainer, AsyncTrainerConfig};
pub use evaluator::{Evaluator, EvaluatorConfig};
pub use messages::{RecordEmitter, RecordMessage};
pub use parameter_store::{GlobalStep, ParameterStore, ParameterSync};
pub use worker::{
    actor_stats_fmt, ActorStat, MetaController, MetaOutcome, SubController, SubOutcome, Worker,
    WorkerConfig,
};
