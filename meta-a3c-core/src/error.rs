//! Errors in the library.
use thiserror::Error;

/// Errors raised by the core components.
///
/// Configuration errors are returned from constructors and are not meant to be
/// recovered from inside a training loop.
#[derive(Debug, Error)]
pub enum MetaA3cError {
    /// The record does not have the given key.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// The value in the record has a type different from the requested one.
    #[error("Record value type error: expected {0}")]
    RecordValueTypeError(String),

    /// The number of actions of the policy differs from that of the environment.
    #[error("Action space mismatch: policy has {policy} actions, environment has {env}")]
    ActionSpaceMismatch {
        /// Number of actions of the policy.
        policy: usize,
        /// Number of actions of the environment.
        env: usize,
    },

    /// The feature vector used for intrinsic reward must have one entry per option.
    #[error("Feature dimension {features} differs from the number of options {options}")]
    FeatureDimMismatch {
        /// Dimension of the feature vector of the sub policy.
        features: usize,
        /// Number of options of the meta policy.
        options: usize,
    },

    /// The environment does not report the maximum number of steps in an episode.
    #[error("The environment does not provide an episode step limit")]
    MissingStepLimit,

    /// Two parameter sets or a parameter set and a gradient do not share the layout.
    #[error("Parameter layout mismatch: expected {expected} values, got {actual}")]
    ParameterLayoutMismatch {
        /// Expected number of values.
        expected: usize,
        /// Given number of values.
        actual: usize,
    },

    /// A parameter with the given name is not in the layout.
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// A trajectory without transitions cannot be used for training.
    #[error("Empty trajectory")]
    EmptyTrajectory,

    /// A transition was pushed into a buffer which already reached its horizon.
    #[error("Trajectory overflow: horizon is {0}")]
    TrajectoryOverflow(usize),
}
