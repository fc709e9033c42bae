//! Policy.
use crate::{
    params::ParameterSet,
    record::{Record, RecordValue},
    trajectory::TrainingBatch,
};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;

/// Input of a recurrent policy at a single time step.
pub struct PolicyInput<'a, O, S> {
    /// Current observation.
    pub obs: &'a O,

    /// Recurrent state before this step.
    pub state: &'a S,

    /// Action taken in the previous step.
    pub prev_action: &'a [f32],

    /// Reward received in the previous step.
    pub prev_reward: f32,

    /// Option the policy is conditioned on. Only used by the sub policy.
    pub context: Option<&'a [f32]>,
}

/// Output of [`RecurrentPolicy::act`].
#[derive(Debug, Clone)]
pub struct ActOutput<S> {
    /// Sampled action, one-hot encoded.
    pub action: Vec<f32>,

    /// Value estimate of the input.
    pub value: f32,

    /// Recurrent state after this step.
    pub state: S,
}

/// Coefficients of the actor-critic loss.
///
/// The loss is `policy_loss + value_coef * value_loss - entropy_coef * entropy`,
/// where `value_loss` is half the sum of squared errors of the value estimates.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LossWeights {
    /// Coefficient of the value loss.
    pub value_coef: f32,

    /// Coefficient of the entropy bonus.
    pub entropy_coef: f32,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self {
            value_coef: 0.5,
            entropy_coef: 0.01,
        }
    }
}

/// Values of the loss terms, summed over a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossStats {
    /// Policy-gradient loss.
    pub policy_loss: f32,

    /// Half the sum of squared errors of value estimates.
    pub value_loss: f32,

    /// Entropy of the policy.
    pub entropy: f32,

    /// Number of samples in the batch.
    pub batch_size: usize,
}

impl LossStats {
    /// Converts the stats into a record, dividing each term by the batch size.
    ///
    /// Keys are `{prefix}/policy_loss`, `{prefix}/value_loss` and `{prefix}/entropy`.
    pub fn to_record(&self, prefix: &str) -> Record {
        let bs = self.batch_size.max(1) as f32;
        Record::from_slice(&[
            (
                format!("{}/policy_loss", prefix),
                RecordValue::Scalar(self.policy_loss / bs),
            ),
            (
                format!("{}/value_loss", prefix),
                RecordValue::Scalar(self.value_loss / bs),
            ),
            (
                format!("{}/entropy", prefix),
                RecordValue::Scalar(self.entropy / bs),
            ),
        ])
    }
}

/// A recurrent actor-critic with discrete actions.
///
/// The policy keeps its own private copy of parameters. Controllers overwrite
/// it with [`RecurrentPolicy::load_params`] before each rollout and push the
/// gradient computed by [`RecurrentPolicy::gradient`] to the shared parameters.
pub trait RecurrentPolicy {
    /// Observation.
    type Obs: Clone;

    /// Recurrent state.
    type State: Clone;

    /// The number of discrete actions.
    fn n_actions(&self) -> usize;

    /// Recurrent state at the beginning of an episode.
    fn initial_state(&self) -> Self::State;

    /// Samples an action and returns it with the value estimate and the next state.
    fn act(&mut self, input: &PolicyInput<Self::Obs, Self::State>)
        -> Result<ActOutput<Self::State>>;

    /// Returns the value estimate of the input.
    fn value(&mut self, input: &PolicyInput<Self::Obs, Self::State>) -> Result<f32>;

    /// Returns a snapshot of the local parameters.
    fn params(&self) -> Result<ParameterSet>;

    /// Overwrites the local parameters.
    fn load_params(&mut self, params: &ParameterSet) -> Result<()>;

    /// Computes the gradient of the loss on a batch with respect to the local
    /// parameters, flattened in the order of the parameter layout.
    fn gradient(
        &mut self,
        batch: &TrainingBatch<Self::Obs, Self::State>,
        weights: &LossWeights,
    ) -> Result<(Vec<f32>, LossStats)>;
}

/// A recurrent policy exposing the features used for the intrinsic reward.
pub trait FeatureControl: RecurrentPolicy {
    /// Returns the feature vector of an observation computed by the target
    /// feature network.
    fn conv_feature(&mut self, obs: &Self::Obs) -> Result<Vec<f32>>;

    /// Length of the feature vector.
    fn feature_dim(&self) -> usize;

    /// Prefix of the names of the feature network parameters.
    fn feature_prefix(&self) -> &str;

    /// Overwrites the parameters of the target feature network.
    fn load_target_params(&mut self, params: &ParameterSet) -> Result<()>;
}

/// A configurable object.
pub trait Configurable {
    /// Configuration.
    type Config: Clone;

    /// Builds the object.
    fn build(config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Build the object with the configuration in the yaml file of the given path.
    fn build_from_path(path: impl AsRef<Path>) -> Result<Self>
    where
        Self: Sized,
        Self::Config: DeserializeOwned,
    {
        let file = std::fs::File::open(path)?;
        let rdr = std::io::BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Self::build(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_loss_stats_record_is_per_sample() {
        let stats = LossStats {
            policy_loss: 4.0,
            value_loss: 2.0,
            entropy: 8.0,
            batch_size: 4,
        };
        let r = stats.to_record("model");
        assert_eq!(r.get_scalar("model/policy_loss").unwrap(), 1.0);
        assert_eq!(r.get_scalar("model/value_loss").unwrap(), 0.5);
        assert_eq!(r.get_scalar("model/entropy").unwrap(), 2.0);
    }
}
