//! Multilayer perceptron.
mod base;
mod config;
use anyhow::Result;
pub use base::Mlp;
use candle_core::Tensor;
use candle_nn::{Linear, Module};
pub use config::MlpConfig;

fn mlp_forward(xs: Tensor, layers: &[Linear], activation_out: bool) -> Result<Tensor> {
    let n_layers = layers.len();
    let mut xs = xs;

    for (i, layer) in layers.iter().enumerate() {
        xs = layer.forward(&xs)?;
        if i + 1 < n_layers || activation_out {
            xs = xs.relu()?;
        }
    }

    Ok(xs)
}
