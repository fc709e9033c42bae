//! Stub environments, policies and optimizers used in tests.
use crate::{
    base::{
        ActOutput, Configurable, Env, FeatureControl, GradientOptimizer, LossStats, LossWeights, PolicyInput,
        RecurrentPolicy, Step,
    },
    params::{ParameterLayout, ParameterSet},
    record::{Record, RecordValue},
    trajectory::TrainingBatch,
    util::one_hot,
};
use anyhow::Result;
use std::sync::{Arc, Mutex};

/// Configuration of [`DummyEnv`].
#[derive(Debug, Clone)]
pub struct DummyEnvConfig {
    /// Reward of every step.
    pub reward: f32,

    /// The environment terminates at this step, never if `None`.
    pub episode_len: Option<usize>,

    /// Value of [`Env::max_episode_steps`].
    pub step_limit: Option<usize>,

    /// The number of actions.
    pub n_actions: usize,

    /// Value of [`Env::autoreset`].
    pub autoreset: bool,

    /// Emit a non-empty info record at every step.
    pub emit_info: bool,
}

impl Default for DummyEnvConfig {
    fn default() -> Self {
        Self {
            reward: 0.0,
            episode_len: None,
            step_limit: Some(1000),
            n_actions: 2,
            autoreset: false,
            emit_info: false,
        }
    }
}

impl DummyEnvConfig {
    /// Sets the reward of every step.
    pub fn reward(mut self, v: f32) -> Self {
        self.reward = v;
        self
    }

    /// Sets the step at which the environment terminates.
    pub fn episode_len(mut self, v: usize) -> Self {
        self.episode_len = Some(v);
        self
    }

    /// Sets the episode step limit.
    pub fn step_limit(mut self, v: Option<usize>) -> Self {
        self.step_limit = v;
        self
    }

    /// Sets the number of actions.
    pub fn n_actions(mut self, v: usize) -> Self {
        self.n_actions = v;
        self
    }

    /// Sets whether the environment resets itself after termination.
    pub fn autoreset(mut self, v: bool) -> Self {
        self.autoreset = v;
        self
    }

    /// Emits an info record at every step.
    pub fn emit_info(mut self, v: bool) -> Self {
        self.emit_info = v;
        self
    }
}

/// Environment whose observation is the number of steps since the last reset.
pub struct DummyEnv {
    config: DummyEnvConfig,
    t: usize,
    n_resets: usize,
    n_steps: usize,
}

impl DummyEnv {
    /// The number of calls of [`Env::reset`].
    pub fn n_resets(&self) -> usize {
        self.n_resets
    }

    /// The number of calls of [`Env::step`].
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }
}

impl Env for DummyEnv {
    type Config = DummyEnvConfig;
    type Obs = usize;

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            t: 0,
            n_resets: 0,
            n_steps: 0,
        })
    }

    fn reset(&mut self) -> Result<usize> {
        self.t = 0;
        self.n_resets += 1;
        Ok(self.t)
    }

    fn step(&mut self, action: usize) -> Result<Step<Self>> {
        self.t += 1;
        self.n_steps += 1;
        let is_terminated = self.config.episode_len.map_or(false, |n| self.t >= n);
        let info = if self.config.emit_info {
            Record::from_slice(&[("env/action", RecordValue::Scalar(action as f32))])
        } else {
            Record::empty()
        };
        Ok(Step::new(self.t, self.config.reward, is_terminated, info))
    }

    fn n_actions(&self) -> usize {
        self.config.n_actions
    }

    fn max_episode_steps(&self) -> Option<usize> {
        self.config.step_limit
    }

    fn autoreset(&self) -> bool {
        self.config.autoreset
    }
}

/// Summary of a batch given to [`RecurrentPolicy::gradient`].
#[derive(Debug, Clone)]
pub struct GradientCall {
    /// Observations.
    pub obs: Vec<usize>,

    /// Rewards.
    pub rewards: Vec<f32>,

    /// Returns.
    pub returns: Vec<f32>,

    /// Advantages.
    pub advantages: Vec<f32>,

    /// Options.
    pub contexts: Option<Vec<Vec<f32>>>,
}

/// Batches seen by [`DummyPolicy`] instances sharing the log.
pub type GradientLog = Arc<Mutex<Vec<GradientCall>>>;

/// Configuration of [`DummyPolicy`].
#[derive(Debug, Clone)]
pub struct DummyPolicyConfig {
    /// The number of actions.
    pub n_actions: usize,

    /// Index of the action always taken.
    pub action: usize,

    /// Value estimate of every state.
    pub value: f32,

    /// Length of the feature vector.
    pub feature_dim: usize,

    /// Value of every entry of the gradient.
    pub grad: f32,

    /// Batches given to the policy.
    pub log: GradientLog,
}

impl Default for DummyPolicyConfig {
    fn default() -> Self {
        Self {
            n_actions: 2,
            action: 0,
            value: 0.0,
            feature_dim: 2,
            grad: 1.0,
            log: Arc::new(Mutex::new(vec![])),
        }
    }
}

impl DummyPolicyConfig {
    /// Sets the number of actions.
    pub fn n_actions(mut self, v: usize) -> Self {
        self.n_actions = v;
        self
    }

    /// Sets the value estimate.
    pub fn value(mut self, v: f32) -> Self {
        self.value = v;
        self
    }

    /// Sets the length of the feature vector.
    pub fn feature_dim(mut self, v: usize) -> Self {
        self.feature_dim = v;
        self
    }

    /// Sets the log of batches.
    pub fn log(mut self, v: GradientLog) -> Self {
        self.log = v;
        self
    }
}

/// Policy taking a fixed action, with features that follow the observation.
///
/// The feature vector of observation `t` is one-hot at `t % feature_dim`.
/// The recurrent state counts the steps since the initial state.
pub struct DummyPolicy {
    config: DummyPolicyConfig,
    params: ParameterSet,
    target: ParameterSet,
}

impl DummyPolicy {
    /// Creates the policy.
    pub fn new(config: DummyPolicyConfig) -> Self {
        let layout = ParameterLayout::new(vec![
            ("feature.weight".to_string(), config.feature_dim),
            ("policy.weight".to_string(), config.n_actions),
        ]);
        let values = vec![0f32; layout.len()];
        let params = ParameterSet {
            layout,
            values,
        };
        let target = params.filter_prefix("feature");
        Self {
            config,
            params,
            target,
        }
    }

    /// The local parameters of the target feature network.
    pub fn target_params(&self) -> &ParameterSet {
        &self.target
    }
}

impl Configurable for DummyPolicy {
    type Config = DummyPolicyConfig;

    fn build(config: Self::Config) -> Result<Self> {
        Ok(Self::new(config))
    }
}

impl RecurrentPolicy for DummyPolicy {
    type Obs = usize;
    type State = usize;

    fn n_actions(&self) -> usize {
        self.config.n_actions
    }

    fn initial_state(&self) -> usize {
        0
    }

    fn act(&mut self, input: &PolicyInput<usize, usize>) -> Result<ActOutput<usize>> {
        Ok(ActOutput {
            action: one_hot(self.config.action, self.config.n_actions),
            value: self.config.value,
            state: input.state + 1,
        })
    }

    fn value(&mut self, _input: &PolicyInput<usize, usize>) -> Result<f32> {
        Ok(self.config.value)
    }

    fn params(&self) -> Result<ParameterSet> {
        Ok(self.params.clone())
    }

    fn load_params(&mut self, params: &ParameterSet) -> Result<()> {
        self.params = params.clone();
        Ok(())
    }

    fn gradient(
        &mut self,
        batch: &TrainingBatch<usize, usize>,
        _weights: &LossWeights,
    ) -> Result<(Vec<f32>, LossStats)> {
        if let Ok(mut log) = self.config.log.lock() {
            log.push(GradientCall {
                obs: batch.obs.clone(),
                rewards: batch.rewards.clone(),
                returns: batch.returns.clone(),
                advantages: batch.advantages.clone(),
                contexts: batch.contexts.clone(),
            });
        }
        let grad = vec![self.config.grad; self.params.values.len()];
        let stats = LossStats {
            batch_size: batch.len(),
            ..Default::default()
        };
        Ok((grad, stats))
    }
}

impl FeatureControl for DummyPolicy {
    fn conv_feature(&mut self, obs: &usize) -> Result<Vec<f32>> {
        let dim = self.config.feature_dim.max(1);
        Ok(one_hot(obs % dim, self.config.feature_dim))
    }

    fn feature_dim(&self) -> usize {
        self.config.feature_dim
    }

    fn feature_prefix(&self) -> &str {
        "feature"
    }

    fn load_target_params(&mut self, params: &ParameterSet) -> Result<()> {
        self.target = params.clone();
        Ok(())
    }
}

/// Configuration of [`DummySgd`].
#[derive(Debug, Clone)]
pub struct DummySgdConfig {
    /// Learning rate.
    pub lr: f32,
}

/// Plain gradient descent.
pub struct DummySgd {
    lr: f32,
    n_params: usize,
}

impl GradientOptimizer for DummySgd {
    type Config = DummySgdConfig;

    fn build(config: &Self::Config, n_params: usize) -> Result<Self> {
        Ok(Self {
            lr: config.lr,
            n_params,
        })
    }

    fn update(&mut self, grad: &[f32]) -> Result<Vec<f32>> {
        debug_assert_eq!(grad.len(), self.n_params);
        Ok(grad.iter().map(|g| -self.lr * g).collect())
    }
}
