//! Hierarchical asynchronous actor-critic in Rust.
//!
//! The workspace consists of the following crates:
//!
//! * `meta-a3c-core` provides the traits of environments, recurrent policies
//!   and optimizers, together with return estimation, intrinsic reward,
//!   trajectories and records.
//! * `meta-a3c-async-trainer` runs meta and sub controllers of workers on
//!   threads against lock-free shared parameters, with periodic evaluation.
//! * `meta-a3c-tensorboard` has `TensorboardRecorder` to write records which
//!   can be shown in Tensorboard.
//! * `meta-a3c-candle-agent` includes a recurrent actor-critic and optimizers
//!   based on [candle](https://crates.io/crates/candle-core).
//! * `meta-a3c` (this crate) has [`GridWorld`], a small environment for
//!   examples and tests.
pub mod grid_world;
pub use grid_world::{GridWorld, GridWorldConfig};
