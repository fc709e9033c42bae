//! Utility function.
use crate::{
    actor_stats_fmt, ActorManager, ActorManagerConfig, AsyncTrainStat, AsyncTrainer,
    AsyncTrainerConfig, Evaluator, EvaluatorConfig, ParameterSync, WorkerConfig,
};
use anyhow::{anyhow, Result};
use crossbeam_channel::unbounded;
use log::info;
use meta_a3c_core::{
    record::Recorder, Configurable, Env, FeatureControl, GradientOptimizer, RecurrentPolicy,
};
use meta_a3c_tensorboard::TensorboardRecorder;
use std::{
    path::Path,
    sync::{atomic::AtomicBool, Arc},
};

/// Configurations of [`train_async`].
pub struct TrainAsyncConfigs<'a, E, P, M, O>
where
    E: Env,
    P: Configurable,
    M: Configurable,
    O: GradientOptimizer,
{
    /// Configurations of sub policies, one for each worker.
    pub policy_configs: &'a [P::Config],

    /// Configurations of meta policies, one for each worker.
    pub meta_policy_configs: &'a [M::Config],

    /// Configuration of the environment of workers.
    pub env_config_train: &'a E::Config,

    /// Configuration of the environment of the evaluator.
    pub env_config_eval: &'a E::Config,

    /// Configuration of the optimizers.
    pub opt_config: &'a O::Config,

    /// Configuration of workers.
    pub worker_config: &'a WorkerConfig,

    /// Configuration of [`ActorManager`].
    pub actor_man_config: &'a ActorManagerConfig,

    /// Configuration of [`AsyncTrainer`].
    pub async_trainer_config: &'a AsyncTrainerConfig,

    /// Configuration of [`Evaluator`].
    pub evaluator_config: &'a EvaluatorConfig,
}

/// Runs asynchronous training.
///
/// This function runs [`ActorManager`] and [`AsyncTrainer`] on threads.
/// These communicate using [`crossbeam_channel`]. Training logs are recorded for
/// tensorboard in `model_dir`.
pub fn train_async<E, P, M, O>(
    model_dir: impl AsRef<Path>,
    configs: &TrainAsyncConfigs<E, P, M, O>,
) -> Result<AsyncTrainStat>
where
    E: Env + 'static,
    P: FeatureControl<Obs = E::Obs> + Configurable + 'static,
    M: RecurrentPolicy<Obs = E::Obs> + Configurable + 'static,
    O: GradientOptimizer + 'static,
    E::Config: Send + 'static,
    P::Config: Send + 'static,
    M::Config: Send + 'static,
    O::Config: Send + 'static,
{
    let mut recorder = TensorboardRecorder::new(model_dir);
    train_async_with_recorder(&mut recorder, configs)
}

/// Runs asynchronous training, writing records to the given recorder.
pub fn train_async_with_recorder<E, P, M, O>(
    recorder: &mut impl Recorder,
    configs: &TrainAsyncConfigs<E, P, M, O>,
) -> Result<AsyncTrainStat>
where
    E: Env + 'static,
    P: FeatureControl<Obs = E::Obs> + Configurable + 'static,
    M: RecurrentPolicy<Obs = E::Obs> + Configurable + 'static,
    O: GradientOptimizer + 'static,
    E::Config: Send + 'static,
    P::Config: Send + 'static,
    M::Config: Send + 'static,
    O::Config: Send + 'static,
{
    let policy_config = configs
        .policy_configs
        .first()
        .ok_or_else(|| anyhow!("No worker is configured"))?;
    let meta_policy_config = configs
        .meta_policy_configs
        .first()
        .ok_or_else(|| anyhow!("No worker is configured"))?;

    // Shared parameters are initialized with those of the evaluator
    let policy = P::build(policy_config.clone())?;
    let meta_policy = M::build(meta_policy_config.clone())?;
    let sync = ParameterSync::from_policies(&policy, &meta_policy)?;
    let env = E::build(configs.env_config_eval, configs.evaluator_config.env_seed)?;
    let mut evaluator = Evaluator::new(
        configs.evaluator_config,
        configs.worker_config,
        env,
        policy,
        meta_policy,
        sync.clone(),
    )?;

    // Shared flag to stop worker threads
    let stop = Arc::new(AtomicBool::new(false));

    // Records from workers
    let (record_s, record_r) = unbounded();

    let mut actors = ActorManager::<E, P, M, O>::build(
        configs.actor_man_config,
        configs.worker_config,
        configs.env_config_train,
        configs.policy_configs,
        configs.meta_policy_configs,
        configs.opt_config,
        sync.clone(),
        record_s,
        stop.clone(),
    )?;
    let mut trainer = AsyncTrainer::build(configs.async_trainer_config, sync, record_r, stop);

    // Starts sampling and training
    actors.run();
    let stats = trainer.train(recorder, &mut evaluator);

    let actor_stats = actors.stop_and_join();
    info!("Stats of workers");
    info!("{}", actor_stats_fmt(&actor_stats));

    let stats = stats?;
    info!("Stats of async trainer");
    info!("{}", stats.fmt());
    Ok(stats)
}
