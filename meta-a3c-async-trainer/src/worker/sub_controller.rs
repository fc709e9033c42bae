use super::WorkerConfig;
use crate::{ParameterSync, RecordEmitter};
use anyhow::Result;
use log::info;
use meta_a3c_core::{
    error::MetaA3cError,
    intrinsic::{IntrinsicRewardModule, RewardShaper},
    params::clip_by_global_norm,
    record::{Record, RecordValue},
    returns::ReturnEstimator,
    rollout::{collect_rollout, LevelStep},
    running_state::RunningEpisodeState,
    util::argmax,
    Env, FeatureControl, GradientOptimizer, LossWeights,
};

/// Result of a sub-level rollout, reported to the meta controller.
#[derive(Debug, Clone)]
pub struct SubOutcome<O> {
    /// Observation after the rollout, the first one of a new episode if the
    /// environment was reset.
    pub obs: O,

    /// Sum of clipped environment rewards, without intrinsic reward.
    pub extrinsic: f32,

    /// The episode ended in the rollout.
    pub terminated: bool,

    /// The last non-empty info record of the environment in the rollout.
    pub info: Record,
}

/// Takes primitive actions conditioned on an option.
///
/// Each call of [`SubController::run`] pulls the shared sub parameters, rolls
/// out at most `sub_horizon` steps and pushes one gradient update.
pub struct SubController<E, P, O>
where
    E: Env,
    P: FeatureControl<Obs = E::Obs>,
    O: GradientOptimizer,
{
    env: E,
    policy: P,
    opt: O,
    running: RunningEpisodeState<E::Obs, P::State>,
    intrinsic: IntrinsicRewardModule,
    shaper: RewardShaper,
    estimator: ReturnEstimator,
    weights: LossWeights,
    horizon: usize,
    max_grad_norm: f32,
    summary_interval: usize,
    step_limit: usize,
    sync: ParameterSync,
    emitter: RecordEmitter,
    local_steps: usize,
    env_steps: usize,
    episodes: usize,
}

impl<E, P, O> SubController<E, P, O>
where
    E: Env,
    P: FeatureControl<Obs = E::Obs>,
    O: GradientOptimizer,
{
    /// Creates a sub controller and resets the environment.
    pub fn build(
        mut env: E,
        policy: P,
        opt: O,
        config: &WorkerConfig,
        sync: ParameterSync,
        emitter: RecordEmitter,
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

        let obs = env.reset()?;
        let running = RunningEpisodeState::new(obs, policy.initial_state(), policy.n_actions());
        let intrinsic = IntrinsicRewardModule::new(
            policy.feature_dim(),
            config.intrinsic_scale,
            config.eps,
        );

        Ok(Self {
            env,
            policy,
            opt,
            running,
            intrinsic,
            shaper: config.shaper(),
            estimator: config.estimator(),
            weights: config.loss_weights(),
            horizon: config.sub_horizon,
            max_grad_norm: config.max_grad_norm,
            summary_interval: config.summary_interval,
            step_limit,
            sync,
            emitter,
            local_steps: 0,
            env_steps: 0,
            episodes: 0,
        })
    }

    /// Runs a rollout under `option` and updates the shared sub parameters.
    pub fn run(&mut self, option: &[f32]) -> Result<SubOutcome<E::Obs>> {
        self.policy.load_params(&self.sync.pull_sub())?;
        self.policy.load_target_params(&self.sync.pull_target())?;
        self.intrinsic.reset();

        let idx = argmax(option);
        let step_limit = self.step_limit;
        let mut intrinsic_sum = 0f32;
        let mut info = Record::empty();

        let rollout = {
            let env = &mut self.env;
            let intrinsic = &mut self.intrinsic;
            let shaper = &self.shaper;
            let emitter = &self.emitter;
            collect_rollout(
                &mut self.policy,
                &mut self.running,
                self.horizon,
                Some(option),
                |policy, action, running| {
                    let step = env.step(argmax(action))?;
                    let clipped = shaper.clip(step.reward);
                    let features = policy.conv_feature(&step.obs)?;
                    let r_int = intrinsic.compute(&features, idx);
                    intrinsic_sum += r_int;

                    if !step.info.is_empty() {
                        emitter.emit(step.info.clone());
                        info = step.info;
                    }

                    Ok(LevelStep {
                        obs: step.obs,
                        reward: shaper.shape(clipped, r_int),
                        extrinsic: clipped,
                        is_terminal: step.is_terminated || running.length + 1 >= step_limit,
                    })
                },
            )?
        };

        let n = rollout.buffer.len();
        let terminated = rollout.terminated;
        let extrinsic = rollout.extrinsic;
        self.env_steps += n;
        self.running.intrinsic_sum += intrinsic_sum;
        if terminated {
            self.end_episode()?;
        }

        let batch = rollout
            .buffer
            .into_batch(&self.estimator, Some(option.to_vec()))?;
        let (mut grad, stats) = self.policy.gradient(&batch, &self.weights)?;
        let grad_norm = clip_by_global_norm(&mut grad, self.max_grad_norm);
        self.sync.push_sub(&grad, &mut self.opt)?;
        self.sync.global_step().add(n as u64);

        if self.emitter.is_chief()
            && self.summary_interval > 0
            && self.local_steps % self.summary_interval == 0
        {
            let mut record = stats.to_record("model");
            record.insert("model/grad_global_norm", RecordValue::Scalar(grad_norm));
            record.insert(
                "model/var_global_norm",
                RecordValue::Scalar(self.policy.params()?.global_norm()),
            );
            self.emitter.emit(record);
        }
        self.local_steps += 1;

        Ok(SubOutcome {
            obs: self.running.obs.clone(),
            extrinsic,
            terminated,
            info,
        })
    }

    fn end_episode(&mut self) -> Result<()> {
        let r = &self.running;
        info!(
            "Worker {}: episode finished, shaped reward = {:.3}, extrinsic reward = {:.3}, length = {}",
            self.emitter.worker_id(),
            r.reward_sum,
            r.extrinsic_sum,
            r.length
        );
        let per_time = r.reward_sum / r.length.max(1) as f32;
        self.emitter.emit(Record::from_slice(&[
            ("global/episode_shaped_reward", RecordValue::Scalar(r.reward_sum)),
            ("global/shaped_reward_per_time", RecordValue::Scalar(per_time)),
            ("global/episode_extrinsic_reward", RecordValue::Scalar(r.extrinsic_sum)),
            ("global/episode_intrinsic_reward", RecordValue::Scalar(r.intrinsic_sum)),
            ("global/episode_length", RecordValue::Scalar(r.length as f32)),
        ]));

        if r.length >= self.step_limit || !self.env.autoreset() {
            self.running.obs = self.env.reset()?;
        }
        self.running.state = self.policy.initial_state();
        self.running.reset_episode_stats();
        self.episodes += 1;
        Ok(())
    }

    /// The environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// The local policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// State of the current episode.
    pub fn running(&self) -> &RunningEpisodeState<E::Obs, P::State> {
        &self.running
    }

    /// The number of updates made by this controller.
    pub fn local_steps(&self) -> usize {
        self.local_steps
    }

    /// The number of environment steps taken by this controller.
    pub fn env_steps(&self) -> usize {
        self.env_steps
    }

    /// The number of finished episodes.
    pub fn episodes(&self) -> usize {
        self.episodes
    }
}
