use super::{SubController, WorkerConfig};
use crate::{ParameterSync, RecordEmitter};
use anyhow::Result;
use log::trace;
use meta_a3c_core::{
    params::{clip_by_global_norm, global_norm},
    record::RecordValue,
    returns::ReturnEstimator,
    rollout::{collect_rollout, LevelStep},
    running_state::RunningEpisodeState,
    Env, FeatureControl, GradientOptimizer, LossWeights, RecurrentPolicy,
};

/// Result of a meta-level rollout.
#[derive(Debug, Clone)]
pub struct MetaOutcome {
    /// The number of meta-level transitions.
    pub len: usize,

    /// The episode ended in the rollout.
    pub terminated: bool,

    /// Sum of the rewards of the meta-level transitions.
    pub extrinsic: f32,

    /// Rewards of the meta-level transitions.
    pub rewards: Vec<f32>,
}

/// Selects options and runs the sub controller under them.
///
/// The reward of a meta-level transition is the sum of the clipped
/// environment rewards collected by the sub controller, without intrinsic
/// reward. The meta level does not advance the global step.
pub struct MetaController<M, O>
where
    M: RecurrentPolicy,
    O: GradientOptimizer,
{
    policy: M,
    opt: O,
    running: RunningEpisodeState<M::Obs, M::State>,
    estimator: ReturnEstimator,
    weights: LossWeights,
    horizon: usize,
    sub_loops: usize,
    max_grad_norm: f32,
    sync: ParameterSync,
    emitter: RecordEmitter,
    local_steps: usize,
}

impl<M, O> MetaController<M, O>
where
    M: RecurrentPolicy,
    O: GradientOptimizer,
{
    /// Creates a meta controller starting from observation `obs`.
    pub fn build(
        policy: M,
        opt: O,
        obs: M::Obs,
        config: &WorkerConfig,
        sync: ParameterSync,
        emitter: RecordEmitter,
    ) -> Self {
        let running = RunningEpisodeState::new(obs, policy.initial_state(), policy.n_actions());
        Self {
            policy,
            opt,
            running,
            estimator: config.estimator(),
            weights: config.loss_weights(),
            horizon: config.meta_horizon,
            sub_loops: config.sub_loops_per_meta_step.max(1),
            max_grad_norm: config.max_grad_norm,
            sync,
            emitter,
            local_steps: 0,
        }
    }

    /// Runs a meta-level rollout and updates the shared meta parameters.
    pub fn run<E, P, SO>(&mut self, sub: &mut SubController<E, P, SO>) -> Result<MetaOutcome>
    where
        E: Env<Obs = M::Obs>,
        P: FeatureControl<Obs = E::Obs>,
        SO: GradientOptimizer,
    {
        self.policy.load_params(&self.sync.pull_meta())?;

        let sub_loops = self.sub_loops;
        let rollout = collect_rollout(
            &mut self.policy,
            &mut self.running,
            self.horizon,
            None,
            |_, option, _| {
                let mut reward = 0f32;
                let mut outcome = sub.run(option)?;
                reward += outcome.extrinsic;
                for _ in 1..sub_loops {
                    if outcome.terminated {
                        break;
                    }
                    outcome = sub.run(option)?;
                    reward += outcome.extrinsic;
                }
                Ok(LevelStep {
                    obs: outcome.obs,
                    reward,
                    extrinsic: reward,
                    is_terminal: outcome.terminated,
                })
            },
        )?;

        let terminated = rollout.terminated;
        let extrinsic = rollout.extrinsic;
        let rewards = rollout.buffer.rewards();
        if terminated {
            self.running.state = self.policy.initial_state();
            self.running.reset_episode_stats();
        }

        let batch = rollout.buffer.into_batch(&self.estimator, None)?;
        let len = batch.len();
        let (mut grad, stats) = self.policy.gradient(&batch, &self.weights)?;
        clip_by_global_norm(&mut grad, self.max_grad_norm);
        self.sync.push_meta(&grad, &mut self.opt)?;
        trace!(
            "Worker {}: meta update with {} transitions",
            self.emitter.worker_id(),
            len
        );

        if self.emitter.is_chief() {
            let mut record = stats.to_record("meta_model");
            // Norm of the clipped gradient, unlike the sub level
            record.insert(
                "meta_model/grad_global_norm",
                RecordValue::Scalar(global_norm(&grad)),
            );
            record.insert(
                "meta_model/var_global_norm",
                RecordValue::Scalar(self.policy.params()?.global_norm()),
            );
            self.emitter.emit(record);
        }
        self.local_steps += 1;

        Ok(MetaOutcome {
            len,
            terminated,
            extrinsic,
            rewards,
        })
    }

    /// The local policy.
    pub fn policy(&self) -> &M {
        &self.policy
    }

    /// State of the current episode.
    pub fn running(&self) -> &RunningEpisodeState<M::Obs, M::State> {
        &self.running
    }

    /// The number of updates made by this controller.
    pub fn local_steps(&self) -> usize {
        self.local_steps
    }
}
