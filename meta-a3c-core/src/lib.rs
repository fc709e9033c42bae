#![warn(missing_docs)]
//! Core components of hierarchical asynchronous actor-critic.
//!
//! A meta controller picks an option every few primitive steps and a sub
//! controller, conditioned on the option, picks primitive actions. This crate
//! provides the traits of the collaborators of both controllers and the
//! algorithms they share:
//!
//! * [`Env`], [`RecurrentPolicy`], [`FeatureControl`] and [`GradientOptimizer`],
//!   implemented by environments and network backends,
//! * [`returns::ReturnEstimator`] for discounted returns and generalized
//!   advantage estimation,
//! * [`intrinsic::IntrinsicRewardModule`] and [`intrinsic::RewardShaper`],
//! * [`trajectory::TrajectoryBuffer`] and [`rollout::collect_rollout`], used
//!   by both levels of the hierarchy,
//! * [`params::ParameterSet`], flat named parameters exchanged with shared stores,
//! * [`record`] for metrics.
//!
//! The controllers and the asynchronous training loop live in
//! `meta-a3c-async-trainer`.
pub mod dummy;
pub mod error;
pub mod intrinsic;
pub mod params;
pub mod record;
pub mod returns;
pub mod rollout;
pub mod running_state;
pub mod trajectory;
pub mod util;

mod base;
pub use base::{
    ActOutput, Configurable, Env, FeatureControl, GradientOptimizer, LossStats, LossWeights,
    PolicyInput, RecurrentPolicy, Step,
};
