use anyhow::Result;

/// Converts a flat gradient into an additive update of the parameters.
///
/// Each worker owns its own instance, so moment estimates are local to the
/// worker while the update is applied to the shared parameters.
pub trait GradientOptimizer: Send {
    /// Configuration.
    type Config: Clone;

    /// Builds an optimizer for a parameter vector of the given length.
    fn build(config: &Self::Config, n_params: usize) -> Result<Self>
    where
        Self: Sized;

    /// Returns the values to be added to the parameters.
    fn update(&mut self, grad: &[f32]) -> Result<Vec<f32>>;
}
