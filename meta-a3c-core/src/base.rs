//! Core functionalities.
mod env;
mod optimizer;
mod policy;
mod step;
pub use env::Env;
pub use optimizer::GradientOptimizer;
pub use policy::{
    ActOutput, Configurable, FeatureControl, LossStats, LossWeights, PolicyInput,
    RecurrentPolicy,
};
pub use step::Step;
