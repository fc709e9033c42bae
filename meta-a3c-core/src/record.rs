//! Types for recording values obtained during training and evaluation.
//!
//! A [`Record`] maps string keys to [`RecordValue`]s. Workers build records for
//! losses, gradient norms and episode statistics, and hand them to a
//! [`Recorder`], which writes them to some output such as TensorBoard.
//!
//! ```rust
//! use meta_a3c_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_slice(&[("global_step", RecordValue::Step(100))]);
//! record.insert("model/policy_loss", RecordValue::Scalar(-0.25));
//! record.insert("model/entropy", RecordValue::Scalar(1.38));
//!
//! assert_eq!(record.get_scalar("model/entropy").unwrap(), 1.38);
//! ```
//!
//! Every record sent from a worker carries the current global step under the
//! key [`GLOBAL_STEP_KEY`], which recorders use as the step of the values.
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;
pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;

/// Key of the global step in records.
pub const GLOBAL_STEP_KEY: &str = "global_step";
