use super::RecurrentActorCriticConfig;
use crate::{
    mlp::{Mlp, MlpConfig},
    util::{copy_from, copy_to, gradients, stack_rows},
};
use anyhow::{bail, Result};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{
    linear, lstm,
    ops::{log_softmax, softmax_last_dim},
    rnn::LSTMState,
    Linear, LSTMConfig, VarBuilder, VarMap, LSTM, RNN,
};
use log::debug;
use meta_a3c_core::{
    error::MetaA3cError, params::ParameterSet, trajectory::TrainingBatch, util::one_hot,
    ActOutput, Configurable, FeatureControl, LossStats, LossWeights, PolicyInput,
    RecurrentPolicy,
};
use rand::{distributions::WeightedIndex, prelude::Distribution, rngs::StdRng, SeedableRng};

/// Prefix of the names of the feature network parameters.
pub const FEATURE_PREFIX: &str = "feature";

/// Hidden and cell state of the LSTM cell.
#[derive(Debug, Clone, PartialEq)]
pub struct LstmState {
    /// Hidden state.
    pub h: Vec<f32>,

    /// Cell state.
    pub c: Vec<f32>,
}

impl LstmState {
    fn zeros(dim: usize) -> Self {
        Self {
            h: vec![0.0; dim],
            c: vec![0.0; dim],
        }
    }
}

/// Recurrent actor-critic used at both levels of the hierarchy.
///
/// Parameters live in a [`VarMap`] named `feature.*`, `lstm.*`, `policy.*` and
/// `value.*`. A second [`VarMap`] holds the target feature network, which
/// computes the features of [`FeatureControl::conv_feature`] and is only
/// changed by [`FeatureControl::load_target_params`].
pub struct RecurrentActorCritic {
    config: RecurrentActorCriticConfig,
    device: Device,
    varmap: VarMap,
    target_varmap: VarMap,
    feature: Mlp,
    target_feature: Mlp,
    lstm: LSTM,
    policy: Linear,
    value: Linear,
    rng: StdRng,
}

impl RecurrentActorCritic {
    /// The configuration.
    pub fn config(&self) -> &RecurrentActorCriticConfig {
        &self.config
    }

    fn obs_tensor(&self, obs: &[f32]) -> Result<Tensor> {
        stack_rows(&[obs.to_vec()], self.config.obs_dim, &self.device)
    }

    fn lstm_state(&self, state: &LstmState) -> Result<LSTMState> {
        let dim = self.config.lstm_dim;
        let h = stack_rows(&[state.h.clone()], dim, &self.device)?;
        let c = stack_rows(&[state.c.clone()], dim, &self.device)?;
        Ok(LSTMState::new(h, c))
    }

    /// Concatenates features with previous actions, previous rewards and
    /// options into the inputs of the LSTM cell, one row per step.
    fn lstm_inputs(
        &self,
        features: &Tensor,
        prev_actions: &[Vec<f32>],
        prev_rewards: &[f32],
        contexts: Option<&[Vec<f32>]>,
    ) -> Result<Tensor> {
        let n = prev_rewards.len();
        let mut xs = vec![
            features.clone(),
            stack_rows(prev_actions, self.config.n_actions, &self.device)?,
            Tensor::from_slice(prev_rewards, (n, 1), &self.device)?,
        ];
        match (self.config.context_dim, contexts) {
            (0, None) => {}
            (0, Some(_)) => bail!("The policy does not take an option"),
            (_, None) => bail!("The policy requires an option"),
            (dim, Some(contexts)) => xs.push(stack_rows(contexts, dim, &self.device)?),
        }
        Ok(Tensor::cat(&xs, 1)?)
    }

    /// Runs a single step and returns the logits, the value and the next state.
    fn step(&self, input: &PolicyInput<Vec<f32>, LstmState>) -> Result<(Tensor, f32, LstmState)> {
        let features = self.feature.forward(&self.obs_tensor(input.obs)?)?;
        let contexts = input.context.map(|c| vec![c.to_vec()]);
        let x = self.lstm_inputs(
            &features,
            &[input.prev_action.to_vec()],
            &[input.prev_reward],
            contexts.as_deref(),
        )?;
        let state = self.lstm.step(&x, &self.lstm_state(input.state)?)?;
        let logits = self.policy.forward(state.h())?;
        let value = self.value.forward(state.h())?.sum_all()?.to_scalar::<f32>()?;
        let next = LstmState {
            h: state.h().flatten_all()?.to_vec1::<f32>()?,
            c: state.c().flatten_all()?.to_vec1::<f32>()?,
        };
        Ok((logits, value, next))
    }
}

impl Configurable for RecurrentActorCritic {
    type Config = RecurrentActorCriticConfig;

    fn build(config: Self::Config) -> Result<Self> {
        let device: Device = config.device.unwrap_or_default().try_into()?;
        let feature_config = MlpConfig::new(
            config.obs_dim,
            config.feature_units.clone(),
            config.feature_dim,
            true,
        );

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let feature = Mlp::build(vb.pp(FEATURE_PREFIX), feature_config.clone())?;
        let lstm = lstm(
            config.lstm_in_dim(),
            config.lstm_dim,
            LSTMConfig::default(),
            vb.pp("lstm"),
        )?;
        let policy = linear(config.lstm_dim, config.n_actions, vb.pp("policy"))?;
        let value = linear(config.lstm_dim, 1, vb.pp("value"))?;

        let target_varmap = VarMap::new();
        let target_vb = VarBuilder::from_varmap(&target_varmap, DType::F32, &device);
        let target_feature = Mlp::build(target_vb.pp(FEATURE_PREFIX), feature_config)?;
        copy_to(
            &copy_from(&varmap)?.filter_prefix(FEATURE_PREFIX),
            &target_varmap,
        )?;

        debug!(
            "Built recurrent actor-critic with {} parameters",
            crate::util::layout(&varmap)?.len()
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            device,
            varmap,
            target_varmap,
            feature,
            target_feature,
            lstm,
            policy,
            value,
        })
    }
}

impl RecurrentPolicy for RecurrentActorCritic {
    type Obs = Vec<f32>;
    type State = LstmState;

    fn n_actions(&self) -> usize {
        self.config.n_actions
    }

    fn initial_state(&self) -> Self::State {
        LstmState::zeros(self.config.lstm_dim)
    }

    fn act(&mut self, input: &PolicyInput<Self::Obs, Self::State>) -> Result<ActOutput<Self::State>> {
        let (logits, value, state) = self.step(input)?;
        let probs = softmax_last_dim(&logits)?.flatten_all()?.to_vec1::<f32>()?;
        let ix = WeightedIndex::new(&probs)?.sample(&mut self.rng);
        Ok(ActOutput {
            action: one_hot(ix, self.config.n_actions),
            value,
            state,
        })
    }

    fn value(&mut self, input: &PolicyInput<Self::Obs, Self::State>) -> Result<f32> {
        let (_, value, _) = self.step(input)?;
        Ok(value)
    }

    fn params(&self) -> Result<ParameterSet> {
        copy_from(&self.varmap)
    }

    fn load_params(&mut self, params: &ParameterSet) -> Result<()> {
        copy_to(params, &self.varmap)
    }

    fn gradient(
        &mut self,
        batch: &TrainingBatch<Self::Obs, Self::State>,
        weights: &LossWeights,
    ) -> Result<(Vec<f32>, LossStats)> {
        let n = batch.len();
        if n == 0 {
            return Err(MetaA3cError::EmptyTrajectory.into());
        }
        let dev = &self.device;

        let obs = stack_rows(&batch.obs, self.config.obs_dim, dev)?;
        let features = self.feature.forward(&obs)?;
        let xs = self.lstm_inputs(
            &features,
            &batch.prev_actions,
            &batch.prev_rewards,
            batch.contexts.as_deref(),
        )?;

        // Unroll from the state at the beginning of the rollout
        let mut state = self.lstm_state(&batch.state_in)?;
        let mut hs = Vec::with_capacity(n);
        for t in 0..n {
            state = self.lstm.step(&xs.narrow(0, t, 1)?, &state)?;
            hs.push(state.h().clone());
        }
        let hs = Tensor::cat(&hs, 0)?;

        let log_probs = log_softmax(&self.policy.forward(&hs)?, D::Minus1)?;
        let probs = log_probs.exp()?;
        let values = self.value.forward(&hs)?.squeeze(1)?;
        let actions = stack_rows(&batch.actions, self.config.n_actions, dev)?;
        let advantages = Tensor::from_slice(&batch.advantages, n, dev)?;
        let returns = Tensor::from_slice(&batch.returns, n, dev)?;

        let log_prob_taken = log_probs.mul(&actions)?.sum(1)?;
        let policy_loss = log_prob_taken.mul(&advantages)?.sum_all()?.neg()?;
        let value_loss = values.sub(&returns)?.sqr()?.sum_all()?.affine(0.5, 0.0)?;
        let entropy = probs.mul(&log_probs)?.sum_all()?.neg()?;
        let loss = policy_loss
            .add(&value_loss.affine(weights.value_coef as f64, 0.0)?)?
            .sub(&entropy.affine(weights.entropy_coef as f64, 0.0)?)?;

        let grads = loss.backward()?;
        let grad = gradients(&self.varmap, &grads)?;
        let stats = LossStats {
            policy_loss: policy_loss.to_scalar::<f32>()?,
            value_loss: value_loss.to_scalar::<f32>()?,
            entropy: entropy.to_scalar::<f32>()?,
            batch_size: n,
        };
        Ok((grad, stats))
    }
}

impl FeatureControl for RecurrentActorCritic {
    fn conv_feature(&mut self, obs: &Self::Obs) -> Result<Vec<f32>> {
        let features = self.target_feature.forward(&self.obs_tensor(obs)?)?;
        Ok(features.flatten_all()?.to_vec1::<f32>()?)
    }

    fn feature_dim(&self) -> usize {
        self.config.feature_dim
    }

    fn feature_prefix(&self) -> &str {
        FEATURE_PREFIX
    }

    fn load_target_params(&mut self, params: &ParameterSet) -> Result<()> {
        copy_to(params, &self.target_varmap)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use meta_a3c_core::params::ParameterLayout;

    fn config() -> RecurrentActorCriticConfig {
        RecurrentActorCriticConfig::default()
            .obs_dim(4)
            .feature_units(vec![8])
            .feature_dim(3)
            .lstm_dim(5)
            .n_actions(2)
            .context_dim(3)
    }

    fn input<'a>(
        obs: &'a Vec<f32>,
        state: &'a LstmState,
        context: Option<&'a [f32]>,
    ) -> PolicyInput<'a, Vec<f32>, LstmState> {
        PolicyInput {
            obs,
            state,
            prev_action: &[0.0, 0.0],
            prev_reward: 0.0,
            context,
        }
    }

    fn batch(policy: &RecurrentActorCritic, returns: f32) -> TrainingBatch<Vec<f32>, LstmState> {
        let n = 4;
        TrainingBatch {
            obs: (0..n).map(|i| one_hot(i, 4)).collect(),
            actions: (0..n).map(|i| one_hot(i % 2, 2)).collect(),
            advantages: vec![0.0; n],
            returns: vec![returns; n],
            state_in: policy.initial_state(),
            prev_actions: vec![vec![0.0; 2]; n],
            prev_rewards: vec![0.0; n],
            contexts: Some(vec![one_hot(1, 3); n]),
            rewards: vec![0.0; n],
        }
    }

    #[test]
    fn test_params_round_trip() -> Result<()> {
        let mut policy = RecurrentActorCritic::build(config())?;
        let params = policy.params()?;
        assert!(params
            .layout
            .entries()
            .iter()
            .any(|(k, _)| k.starts_with(FEATURE_PREFIX)));
        assert_eq!(params.layout, crate::util::layout(&policy.varmap)?);

        let values = (0..params.values.len()).map(|i| i as f32 * 1e-3).collect();
        let modified = ParameterSet::new(params.layout.clone(), values)?;
        policy.load_params(&modified)?;
        assert_eq!(policy.params()?, modified);

        let wrong = ParameterSet::new(ParameterLayout::new(vec![("x".into(), 1)]), vec![0.0])?;
        assert!(policy.load_params(&wrong).is_err());
        Ok(())
    }

    #[test]
    fn test_act_samples_one_hot_action() -> Result<()> {
        let mut policy = RecurrentActorCritic::build(config())?;
        let obs = vec![1.0, 0.0, 0.0, 0.0];
        let state = policy.initial_state();
        let option = [0.0, 1.0, 0.0];

        let out = policy.act(&input(&obs, &state, Some(&option[..])))?;
        assert_eq!(out.action.len(), 2);
        assert_eq!(out.action.iter().sum::<f32>(), 1.0);
        assert_eq!(out.state.h.len(), 5);
        assert_eq!(out.state.c.len(), 5);
        assert_ne!(out.state, state);
        assert!(out.value.is_finite());

        let v = policy.value(&input(&obs, &state, Some(&option[..])))?;
        assert!((v - out.value).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_option_must_match_context_dim() -> Result<()> {
        let mut policy = RecurrentActorCritic::build(config())?;
        let obs = vec![0.0; 4];
        let state = policy.initial_state();
        assert!(policy.act(&input(&obs, &state, None)).is_err());
        assert!(policy.act(&input(&obs, &state, Some(&[1.0][..]))).is_err());

        let mut meta = RecurrentActorCritic::build(config().context_dim(0))?;
        assert!(meta.act(&input(&obs, &state, Some(&[1.0, 0.0, 0.0][..]))).is_err());
        assert!(meta.act(&input(&obs, &state, None)).is_ok());
        Ok(())
    }

    #[test]
    fn test_conv_feature_uses_target_network() -> Result<()> {
        let mut policy = RecurrentActorCritic::build(config())?;
        let obs = vec![1.0, 2.0, 3.0, 4.0];
        let features = policy.conv_feature(&obs)?;
        assert_eq!(features.len(), policy.feature_dim());
        assert!(features.iter().all(|&f| f >= 0.0));

        let target = policy.params()?.filter_prefix(policy.feature_prefix());
        let zeros = ParameterSet::new(target.layout.clone(), vec![0.0; target.values.len()])?;
        policy.load_target_params(&zeros)?;
        assert_eq!(policy.conv_feature(&obs)?, vec![0.0; 3]);

        // The online feature network is unchanged
        assert_eq!(policy.params()?.filter_prefix(FEATURE_PREFIX), target);
        Ok(())
    }

    #[test]
    fn test_gradient_follows_layout() -> Result<()> {
        let mut policy = RecurrentActorCritic::build(config())?;
        let batch = batch(&policy, 1.0);
        let (grad, stats) = policy.gradient(&batch, &LossWeights::default())?;
        assert_eq!(grad.len(), policy.params()?.values.len());
        assert!(grad.iter().all(|g| g.is_finite()));
        assert!(grad.iter().any(|&g| g != 0.0));
        assert_eq!(stats.batch_size, 4);
        assert_eq!(stats.policy_loss, 0.0);
        assert!(stats.entropy > 0.0);
        Ok(())
    }

    #[test]
    fn test_gradient_descent_reduces_value_loss() -> Result<()> {
        let mut policy = RecurrentActorCritic::build(config())?;
        let batch = batch(&policy, 1.0);
        let weights = LossWeights {
            value_coef: 1.0,
            entropy_coef: 0.0,
        };

        let mut params = policy.params()?;
        let (_, first) = policy.gradient(&batch, &weights)?;
        for _ in 0..20 {
            let (grad, _) = policy.gradient(&batch, &weights)?;
            params
                .values
                .iter_mut()
                .zip(grad.iter())
                .for_each(|(p, g)| *p -= 0.01 * g);
            policy.load_params(&params)?;
        }
        let (_, last) = policy.gradient(&batch, &weights)?;
        assert!(last.value_loss < first.value_loss);
        Ok(())
    }

    #[test]
    fn test_empty_batch_is_an_error() -> Result<()> {
        let mut policy = RecurrentActorCritic::build(config())?;
        let mut batch = batch(&policy, 0.0);
        batch.obs.clear();
        batch.actions.clear();
        batch.advantages.clear();
        batch.returns.clear();
        batch.prev_actions.clear();
        batch.prev_rewards.clear();
        batch.contexts = Some(vec![]);
        batch.rewards.clear();
        assert!(policy.gradient(&batch, &LossWeights::default()).is_err());
        Ok(())
    }
}
