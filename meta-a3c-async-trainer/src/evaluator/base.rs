use super::EvaluatorConfig;
use crate::{ParameterSync, WorkerConfig};
use anyhow::Result;
use log::info;
use meta_a3c_core::{
    error::MetaA3cError,
    intrinsic::{IntrinsicRewardModule, RewardShaper},
    record::{Record, RecordValue, GLOBAL_STEP_KEY},
    running_state::RunningEpisodeState,
    util::{argmax, mean_std},
    Configurable, Env, FeatureControl, RecurrentPolicy,
};

/// Runs episodes with the shared parameters without learning.
///
/// Metrics are `Eval/Average_Reward` and `Eval/SD_Reward`, the mean and the
/// population standard deviation of unclipped episode returns, and
/// `Eval/Average_Length`.
pub struct Evaluator<E, P, M>
where
    E: Env,
    P: FeatureControl<Obs = E::Obs>,
    M: RecurrentPolicy<Obs = E::Obs>,
{
    env: E,
    policy: P,
    meta_policy: M,
    intrinsic: IntrinsicRewardModule,
    shaper: RewardShaper,
    n_episodes: usize,
    render: bool,
    steps_per_option: usize,
    step_limit: usize,
    sync: ParameterSync,
}

impl<E, P, M> Evaluator<E, P, M>
where
    E: Env,
    P: FeatureControl<Obs = E::Obs>,
    M: RecurrentPolicy<Obs = E::Obs>,
{
    /// Creates an evaluator from built components.
    pub fn new(
        config: &EvaluatorConfig,
        worker_config: &WorkerConfig,
        env: E,
        policy: P,
        meta_policy: M,
        sync: ParameterSync,
    ) -> Result<Self> {
        if policy.n_actions() != env.n_actions() {
            return Err(MetaA3cError::ActionSpaceMismatch {
                policy: policy.n_actions(),
                env: env.n_actions(),
            }
            .into());
        }
        let step_limit = env
            .max_episode_steps()
            .ok_or(MetaA3cError::MissingStepLimit)?;
        let intrinsic = IntrinsicRewardModule::new(
            policy.feature_dim(),
            worker_config.intrinsic_scale,
            worker_config.eps,
        );

        Ok(Self {
            env,
            policy,
            meta_policy,
            intrinsic,
            shaper: worker_config.shaper(),
            n_episodes: config.n_episodes,
            render: config.render,
            steps_per_option: (worker_config.sub_horizon
                * worker_config.sub_loops_per_meta_step)
                .max(1),
            step_limit,
            sync,
        })
    }

    /// Builds an evaluator from configurations.
    pub fn build(
        config: &EvaluatorConfig,
        worker_config: &WorkerConfig,
        env_config: &E::Config,
        policy_config: P::Config,
        meta_policy_config: M::Config,
        sync: ParameterSync,
    ) -> Result<Self>
    where
        P: Configurable,
        M: Configurable,
    {
        let env = E::build(env_config, config.env_seed)?;
        let policy = P::build(policy_config)?;
        let meta_policy = M::build(meta_policy_config)?;
        Self::new(config, worker_config, env, policy, meta_policy, sync)
    }

    /// Runs episodes and returns the metrics, tagged with the global step at
    /// the beginning of the evaluation.
    pub fn evaluate(&mut self) -> Result<Record> {
        let global_step = self.sync.global_step().get();
        self.policy.load_params(&self.sync.pull_sub())?;
        self.policy.load_target_params(&self.sync.pull_target())?;
        self.meta_policy.load_params(&self.sync.pull_meta())?;

        let mut returns = Vec::with_capacity(self.n_episodes);
        let mut lengths = Vec::with_capacity(self.n_episodes);
        for _ in 0..self.n_episodes {
            let (ret, len) = self.run_episode()?;
            returns.push(ret);
            lengths.push(len as f32);
        }

        let (mean, sd) = mean_std(&returns);
        let (mean_len, _) = mean_std(&lengths);
        info!(
            "Evaluation at global step {}: average reward = {:.3}, sd = {:.3}, average length = {:.1}",
            global_step, mean, sd, mean_len
        );

        Ok(Record::from_slice(&[
            ("Eval/Average_Reward", RecordValue::Scalar(mean)),
            ("Eval/SD_Reward", RecordValue::Scalar(sd)),
            ("Eval/Average_Length", RecordValue::Scalar(mean_len)),
            (GLOBAL_STEP_KEY, RecordValue::Step(global_step)),
        ]))
    }

    /// Returns the unclipped return and the length of an episode.
    fn run_episode(&mut self) -> Result<(f32, usize)> {
        let obs = self.env.reset()?;
        let mut sub = RunningEpisodeState::new(
            obs.clone(),
            self.policy.initial_state(),
            self.policy.n_actions(),
        );
        let mut meta = RunningEpisodeState::new(
            obs,
            self.meta_policy.initial_state(),
            self.meta_policy.n_actions(),
        );
        let mut ret = 0f32;
        let mut terminal = false;

        while !terminal {
            let out = self.meta_policy.act(&meta.input(None))?;
            let option = out.action;
            let idx = argmax(&option);
            let mut meta_reward = 0f32;
            self.intrinsic.reset();

            for _ in 0..self.steps_per_option {
                let a = self.policy.act(&sub.input(Some(option.as_slice())))?;
                let step = self.env.step(argmax(&a.action))?;
                if self.render {
                    self.env.render()?;
                }
                let clipped = self.shaper.clip(step.reward);
                let features = self.policy.conv_feature(&step.obs)?;
                let r_int = self.intrinsic.compute(&features, idx);

                sub.obs = step.obs;
                sub.state = a.state;
                sub.action = a.action;
                sub.reward = self.shaper.shape(clipped, r_int);
                sub.length += 1;
                ret += step.reward;
                meta_reward += clipped;

                if step.is_terminated || sub.length >= self.step_limit {
                    terminal = true;
                    break;
                }
            }

            meta.obs = sub.obs.clone();
            meta.state = out.state;
            meta.action = option;
            meta.reward = meta_reward;
        }

        Ok((ret, sub.length))
    }
}
