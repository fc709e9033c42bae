//! Optimizers.
//!
//! Gradients arrive as flat vectors computed against a snapshot of the shared
//! parameters, and the update has to be applied to the shared store, not to
//! a local tensor. [`Optimizer`] therefore keeps a single zero-valued variable
//! of the length of the parameter vector, feeds the gradient to a candle
//! optimizer for that variable and reads back how far the variable moved.
use anyhow::{bail, Result};
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW, SGD};
use candle_optimisers::adam::{Adam, ParamsAdam};
use log::trace;
use meta_a3c_core::{error::MetaA3cError, GradientOptimizer};
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for training the shared parameters.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// AdamW optimizer.
    AdamW {
        /// Learning rate.
        lr: f64,
        /// Decay of the first moment.
        #[serde(default = "default_beta1")]
        beta1: f64,
        /// Decay of the second moment.
        #[serde(default = "default_beta2")]
        beta2: f64,
        /// Term added to the denominator.
        #[serde(default = "default_eps")]
        eps: f64,
        /// Weight decay. Must be zero: the decay acts on the variable
        /// receiving the update, which is zero at every step, not on the
        /// shared parameters.
        #[serde(default = "default_weight_decay")]
        weight_decay: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },

    /// Plain stochastic gradient descent.
    Sgd {
        /// Learning rate.
        lr: f64,
    },
}

fn default_beta1() -> f64 {
    ParamsAdamW::default().beta1
}

fn default_beta2() -> f64 {
    ParamsAdamW::default().beta2
}

fn default_eps() -> f64 {
    ParamsAdamW::default().eps
}

fn default_weight_decay() -> f64 {
    0.0
}

impl OptimizerConfig {
    fn build_inner(&self, vars: Vec<Var>) -> Result<Inner> {
        match &self {
            OptimizerConfig::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => {
                if *weight_decay != 0.0 {
                    bail!("AdamW weight decay is not supported, got {}", weight_decay);
                }
                let params = ParamsAdamW {
                    lr: *lr,
                    beta1: *beta1,
                    beta2: *beta2,
                    eps: *eps,
                    weight_decay: *weight_decay,
                };
                Ok(Inner::AdamW(AdamW::new(vars, params)?))
            }
            OptimizerConfig::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                Ok(Inner::Adam(Adam::new(vars, params)?))
            }
            OptimizerConfig::Sgd { lr } => Ok(Inner::Sgd(SGD::new(vars, *lr)?)),
        }
    }

    /// Override learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::AdamW {
                lr: _,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => Self::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            },
            Self::Adam { lr: _ } => Self::Adam { lr },
            Self::Sgd { lr: _ } => Self::Sgd { lr },
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam { lr: 1e-4 }
    }
}

enum Inner {
    AdamW(AdamW),
    Adam(Adam),
    Sgd(SGD),
}

impl Inner {
    fn step(&mut self, grads: &candle_core::backprop::GradStore) -> Result<()> {
        match self {
            Self::AdamW(opt) => Ok(opt.step(grads)?),
            Self::Adam(opt) => Ok(opt.step(grads)?),
            Self::Sgd(opt) => Ok(opt.step(grads)?),
        }
    }
}

/// Optimizer owned by a worker, one per level of the hierarchy.
///
/// Moment estimates are local to the instance.
pub struct Optimizer {
    inner: Inner,
    delta: Var,
    n_params: usize,
}

impl Optimizer {
    /// The number of parameters this optimizer was built for.
    pub fn n_params(&self) -> usize {
        self.n_params
    }
}

impl GradientOptimizer for Optimizer {
    type Config = OptimizerConfig;

    fn build(config: &Self::Config, n_params: usize) -> Result<Self> {
        let delta = Var::zeros(n_params, DType::F32, &Device::Cpu)?;
        let inner = config.build_inner(vec![delta.clone()])?;
        trace!("Built optimizer for {} parameters", n_params);
        Ok(Self {
            inner,
            delta,
            n_params,
        })
    }

    fn update(&mut self, grad: &[f32]) -> Result<Vec<f32>> {
        if grad.len() != self.n_params {
            return Err(MetaA3cError::ParameterLayoutMismatch {
                expected: self.n_params,
                actual: grad.len(),
            }
            .into());
        }

        // d(sum(delta * g)) / d(delta) = g
        let g = Tensor::from_slice(grad, grad.len(), &Device::Cpu)?;
        let surrogate = self.delta.as_tensor().mul(&g)?.sum_all()?;
        let grads = surrogate.backward()?;
        self.inner.step(&grads)?;

        let delta = self.delta.as_tensor().to_vec1::<f32>()?;
        self.delta.set(&self.delta.as_tensor().zeros_like()?)?;
        Ok(delta)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sgd_update_is_scaled_negative_gradient() -> Result<()> {
        let mut opt = Optimizer::build(&OptimizerConfig::Sgd { lr: 0.1 }, 3)?;
        let delta = opt.update(&[1.0, -2.0, 0.0])?;
        assert!((delta[0] + 0.1).abs() < 1e-6);
        assert!((delta[1] - 0.2).abs() < 1e-6);
        assert_eq!(delta[2], 0.0);

        // The variable is reset, so the same gradient gives the same update
        let delta2 = opt.update(&[1.0, -2.0, 0.0])?;
        assert_eq!(delta, delta2);
        Ok(())
    }

    #[test]
    fn test_adam_first_step_has_learning_rate_size() -> Result<()> {
        let mut opt = Optimizer::build(&OptimizerConfig::Adam { lr: 0.01 }, 2)?;
        let delta = opt.update(&[5.0, -0.5])?;
        assert!((delta[0] + 0.01).abs() < 1e-4);
        assert!((delta[1] - 0.01).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_gradient_length_is_checked() -> Result<()> {
        let mut opt = Optimizer::build(&OptimizerConfig::default(), 3)?;
        assert!(opt.update(&[1.0; 2]).is_err());
        Ok(())
    }

    #[test]
    fn test_adamw_rejects_weight_decay() -> Result<()> {
        let config = OptimizerConfig::AdamW {
            lr: 0.01,
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_eps(),
            weight_decay: 0.01,
        };
        assert!(Optimizer::build(&config, 2).is_err());

        let config: OptimizerConfig = serde_yaml::from_str("AdamW:\n  lr: 0.01\n")?;
        let mut opt = Optimizer::build(&config, 2)?;
        let delta = opt.update(&[1.0, -1.0])?;
        assert!((delta[0] + 0.01).abs() < 1e-4);
        assert!((delta[1] - 0.01).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_learning_rate_override() {
        let config = OptimizerConfig::default().learning_rate(0.5);
        assert_eq!(config, OptimizerConfig::Adam { lr: 0.5 });
    }
}
