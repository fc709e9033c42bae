use crate::{ActorManagerConfig, ActorStat, ParameterSync, RecordMessage, Worker, WorkerConfig};
use anyhow::{anyhow, Result};
use crossbeam_channel::Sender;
use log::{error, info};
use meta_a3c_core::{Configurable, Env, FeatureControl, GradientOptimizer, RecurrentPolicy};
use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Instant,
};

/// Manages [`Worker`]s, one thread each.
///
/// Workers are built inside their threads from configurations, so the
/// environment and the policies need not be [`Send`]. A worker checks the
/// stop flag between calls of [`Worker::process`]. A worker returning an
/// error exits, the others keep running.
pub struct ActorManager<E, P, M, O>
where
    E: Env,
    P: FeatureControl<Obs = E::Obs> + Configurable,
    M: RecurrentPolicy<Obs = E::Obs> + Configurable,
    O: GradientOptimizer,
{
    /// Configurations of sub policies, one for each worker.
    policy_configs: Vec<P::Config>,

    /// Configurations of meta policies, one for each worker.
    meta_policy_configs: Vec<M::Config>,

    /// Configuration of [`Env`].
    env_config: E::Config,

    /// Configuration of the optimizers.
    opt_config: O::Config,

    worker_config: WorkerConfig,

    env_seed_offset: i64,

    sync: ParameterSync,

    /// Sender of records, handed over to the workers on [`ActorManager::run`].
    sender: Option<Sender<RecordMessage>>,

    /// Flag to stop training
    stop: Arc<AtomicBool>,

    /// Thread handles.
    threads: Vec<JoinHandle<Result<ActorStat>>>,

    phantom: PhantomData<(E, P, M, O)>,
}

impl<E, P, M, O> ActorManager<E, P, M, O>
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
    /// Builds a [`ActorManager`].
    ///
    /// `policy_configs` and `meta_policy_configs` must have the same length,
    /// the number of workers.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        config: &ActorManagerConfig,
        worker_config: &WorkerConfig,
        env_config: &E::Config,
        policy_configs: &[P::Config],
        meta_policy_configs: &[M::Config],
        opt_config: &O::Config,
        sync: ParameterSync,
        sender: Sender<RecordMessage>,
        stop: Arc<AtomicBool>,
    ) -> Result<Self> {
        if policy_configs.len() != meta_policy_configs.len() {
            return Err(anyhow!(
                "{} sub policy configs but {} meta policy configs",
                policy_configs.len(),
                meta_policy_configs.len()
            ));
        }
        Ok(Self {
            policy_configs: policy_configs.to_vec(),
            meta_policy_configs: meta_policy_configs.to_vec(),
            env_config: env_config.clone(),
            opt_config: opt_config.clone(),
            worker_config: worker_config.clone(),
            env_seed_offset: config.env_seed_offset,
            sync,
            sender: Some(sender),
            stop,
            threads: vec![],
            phantom: PhantomData,
        })
    }

    /// The number of workers.
    pub fn n_workers(&self) -> usize {
        self.policy_configs.len()
    }

    /// Spawns worker threads.
    pub fn run(&mut self) {
        let sender = match self.sender.take() {
            Some(s) => s,
            None => {
                error!("ActorManager::run() was called twice");
                return;
            }
        };

        for (id, (policy_config, meta_policy_config)) in self
            .policy_configs
            .iter()
            .cloned()
            .zip(self.meta_policy_configs.iter().cloned())
            .enumerate()
        {
            let env_config = self.env_config.clone();
            let opt_config = self.opt_config.clone();
            let worker_config = self.worker_config.clone();
            let sync = self.sync.clone();
            let sender = sender.clone();
            let stop = self.stop.clone();
            let seed = self.env_seed_offset + id as i64;

            let handle = std::thread::spawn(move || {
                let stat = Self::run_worker(
                    id,
                    env_config,
                    seed,
                    policy_config,
                    meta_policy_config,
                    opt_config,
                    worker_config,
                    sync,
                    sender,
                    stop,
                );
                if let Err(e) = &stat {
                    error!("Worker {} exited with an error: {:?}", id, e);
                }
                stat
            });
            self.threads.push(handle);
        }
        info!("Started {} workers", self.threads.len());
    }

    #[allow(clippy::too_many_arguments)]
    fn run_worker(
        id: usize,
        env_config: E::Config,
        seed: i64,
        policy_config: P::Config,
        meta_policy_config: M::Config,
        opt_config: O::Config,
        worker_config: WorkerConfig,
        sync: ParameterSync,
        sender: Sender<RecordMessage>,
        stop: Arc<AtomicBool>,
    ) -> Result<ActorStat> {
        let start = Instant::now();
        let mut worker = Worker::<E, P, M, O>::build(
            id,
            &env_config,
            seed,
            policy_config,
            meta_policy_config,
            &opt_config,
            &worker_config,
            sync,
            Some(sender),
        )?;
        info!("Worker {} started", id);

        while !stop.load(Ordering::SeqCst) {
            worker.process()?;
        }

        info!("Worker {} stopped", id);
        Ok(worker.stat(start.elapsed()))
    }

    /// Stops worker threads.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Waits until all workers finish and returns stats of those that
    /// finished without an error.
    pub fn join(self) -> Vec<ActorStat> {
        let mut stats = vec![];
        for (id, h) in self.threads.into_iter().enumerate() {
            match h.join() {
                Ok(Ok(stat)) => stats.push(stat),
                Ok(Err(_)) => {}
                Err(_) => error!("Worker {} panicked", id),
            }
        }
        stats
    }

    /// Stops and joins workers.
    pub fn stop_and_join(self) -> Vec<ActorStat> {
        self.stop();
        self.join()
    }
}
