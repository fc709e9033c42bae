use super::{mlp_forward, MlpConfig};
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::{linear, Linear, VarBuilder};

/// Multilayer perceptron with ReLU activation function.
///
/// Layers are named `ln0`, `ln1`, ... under the prefix of the given [`VarBuilder`].
pub struct Mlp {
    config: MlpConfig,
    layers: Vec<Linear>,
}

impl Mlp {
    /// Builds the layers.
    pub fn build(vb: VarBuilder, config: MlpConfig) -> Result<Self> {
        let layers = config
            .in_out_pairs()
            .into_iter()
            .enumerate()
            .map(|(i, (in_dim, out_dim))| linear(in_dim, out_dim, vb.pp(format!("ln{}", i))))
            .collect::<candle_core::Result<Vec<_>>>()?;

        Ok(Self { config, layers })
    }

    /// Output dimension.
    pub fn out_dim(&self) -> usize {
        self.config.out_dim()
    }

    /// Applies the layers to a batch of shape `(batch, in_dim)`.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        mlp_forward(xs.clone(), &self.layers, self.config.activation_out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_layer_names_and_output_shape() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mlp = Mlp::build(vb.pp("feature"), MlpConfig::new(3, vec![8, 8], 4, true))?;

        let xs = Tensor::ones((5, 3), DType::F32, &Device::Cpu)?;
        let ys = mlp.forward(&xs)?;
        assert_eq!(ys.dims(), &[5, 4]);
        assert!(ys.flatten_all()?.to_vec1::<f32>()?.iter().all(|&y| y >= 0.0));

        let mut names = varmap.data().lock().unwrap().keys().cloned().collect::<Vec<_>>();
        names.sort();
        assert_eq!(
            names,
            vec![
                "feature.ln0.bias",
                "feature.ln0.weight",
                "feature.ln1.bias",
                "feature.ln1.weight",
                "feature.ln2.bias",
                "feature.ln2.weight",
            ]
        );
        Ok(())
    }
}
