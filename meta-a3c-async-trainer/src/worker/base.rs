use super::{ActorStat, MetaController, SubController, WorkerConfig};
use crate::{ParameterSync, RecordEmitter, RecordMessage};
use anyhow::Result;
use crossbeam_channel::Sender;
use log::debug;
use meta_a3c_core::{
    error::MetaA3cError, Configurable, Env, FeatureControl, GradientOptimizer, RecurrentPolicy,
};
use std::time::Duration;

/// Trains the shared parameters with its own environment and local policies.
///
/// A call of [`Worker::process`] synchronizes the target feature network and
/// then runs `meta_loops_per_target_sync` meta-level rollouts.
pub struct Worker<E, P, M, O>
where
    E: Env,
    P: FeatureControl<Obs = E::Obs>,
    M: RecurrentPolicy<Obs = E::Obs>,
    O: GradientOptimizer,
{
    id: usize,
    sub: SubController<E, P, O>,
    meta: MetaController<M, O>,
    sync: ParameterSync,
    meta_loops_per_target_sync: usize,
}

impl<E, P, M, O> Worker<E, P, M, O>
where
    E: Env,
    P: FeatureControl<Obs = E::Obs>,
    M: RecurrentPolicy<Obs = E::Obs>,
    O: GradientOptimizer,
{
    /// Creates a worker from built components.
    ///
    /// Fails if the sub policy and the environment differ in the number of
    /// actions, if the feature dimension differs from the number of options,
    /// or if the environment has no episode step limit.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        env: E,
        policy: P,
        meta_policy: M,
        opt_config: &O::Config,
        config: &WorkerConfig,
        sync: ParameterSync,
        sender: Option<Sender<RecordMessage>>,
    ) -> Result<Self> {
        if policy.feature_dim() != meta_policy.n_actions() {
            return Err(MetaA3cError::FeatureDimMismatch {
                features: policy.feature_dim(),
                options: meta_policy.n_actions(),
            }
            .into());
        }
        let emitter = RecordEmitter::new(id, sender, sync.shared_global_step());
        let sub_opt = O::build(opt_config, sync.sub().len())?;
        let meta_opt = O::build(opt_config, sync.meta().len())?;

        let sub = SubController::build(env, policy, sub_opt, config, sync.clone(), emitter.clone())?;
        let obs = sub.running().obs.clone();
        let meta = MetaController::build(meta_policy, meta_opt, obs, config, sync.clone(), emitter);

        Ok(Self {
            id,
            sub,
            meta,
            sync,
            meta_loops_per_target_sync: config.meta_loops_per_target_sync,
        })
    }

    /// Builds a worker from configurations.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        id: usize,
        env_config: &E::Config,
        env_seed: i64,
        policy_config: P::Config,
        meta_policy_config: M::Config,
        opt_config: &O::Config,
        config: &WorkerConfig,
        sync: ParameterSync,
        sender: Option<Sender<RecordMessage>>,
    ) -> Result<Self>
    where
        P: Configurable,
        M: Configurable,
    {
        let env = E::build(env_config, env_seed)?;
        let policy = P::build(policy_config)?;
        let meta_policy = M::build(meta_policy_config)?;
        Self::new(id, env, policy, meta_policy, opt_config, config, sync, sender)
    }

    /// Synchronizes the target feature network and runs meta-level rollouts.
    pub fn process(&mut self) -> Result<()> {
        self.sync.sync_target()?;
        debug!("Worker {}: synchronized target feature network", self.id);

        for _ in 0..self.meta_loops_per_target_sync {
            self.meta.run(&mut self.sub)?;
        }
        Ok(())
    }

    /// ID of the worker.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The sub controller.
    pub fn sub(&self) -> &SubController<E, P, O> {
        &self.sub
    }

    /// The meta controller.
    pub fn meta(&self) -> &MetaController<M, O> {
        &self.meta
    }

    /// Stats of the worker.
    pub fn stat(&self, duration: Duration) -> ActorStat {
        ActorStat {
            env_steps: self.sub.env_steps(),
            sub_updates: self.sub.local_steps(),
            meta_updates: self.meta.local_steps(),
            episodes: self.sub.episodes(),
            duration,
        }
    }
}
