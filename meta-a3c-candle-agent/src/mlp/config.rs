use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    pub(super) in_dim: usize,
    pub(super) units: Vec<usize>,
    pub(super) out_dim: usize,
    pub(super) activation_out: bool,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `units` - Sizes of the hidden layers, possibly empty.
    /// * `activation_out` - If `true`, activation function is added in the final layer.
    pub fn new(in_dim: usize, units: Vec<usize>, out_dim: usize, activation_out: bool) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
        }
    }

    /// Output dimension.
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// `(in, out)` dimensions of the layers.
    pub(super) fn in_out_pairs(&self) -> Vec<(usize, usize)> {
        let mut dims = Vec::with_capacity(self.units.len() + 2);
        dims.push(self.in_dim);
        dims.extend_from_slice(&self.units);
        dims.push(self.out_dim);
        dims.windows(2).map(|w| (w[0], w[1])).collect()
    }
}
