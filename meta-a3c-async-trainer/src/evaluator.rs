//! Evaluation of the shared parameters.
mod base;
mod config;
pub use base::Evaluator;
pub use config::EvaluatorConfig;
