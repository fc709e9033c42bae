use crate::{AsyncTrainStat, AsyncTrainerConfig, Evaluator, ParameterSync, RecordMessage};
use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{info, warn};
use meta_a3c_core::{record::Recorder, Env, FeatureControl, RecurrentPolicy};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the asynchronous training loop in a single machine.
///
/// Workers run on threads of an [`ActorManager`](crate::ActorManager) and
/// update the shared parameters by themselves. This struct writes the records
/// sent by the workers, evaluates and saves the shared parameters at fixed
/// intervals of the global step, and raises the stop flag at the end of
/// training.
///
/// ```mermaid
/// flowchart LR
///   W0[Worker 0] -- pull/push --> S[(ParameterSync)]
///   W1[Worker 1] -- pull/push --> S
///   W0 -- RecordMessage --> T[AsyncTrainer]
///   W1 -- RecordMessage --> T
///   T -- evaluate --> E[Evaluator]
///   E -- pull --> S
///   T --> R[Recorder]
/// ```
pub struct AsyncTrainer {
    /// Where to save the parameters.
    model_dir: Option<String>,

    /// Interval of evaluation in global steps.
    eval_interval: u64,

    /// The maximal global step.
    max_global_steps: u64,

    /// Interval of saving the parameters in global steps.
    save_interval: u64,

    record_poll_timeout: Duration,

    /// Receiver of records from workers.
    receiver: Receiver<RecordMessage>,

    sync: ParameterSync,

    /// Flag to stop workers.
    stop: Arc<AtomicBool>,
}

impl AsyncTrainer {
    /// Creates [`AsyncTrainer`].
    pub fn build(
        config: &AsyncTrainerConfig,
        sync: ParameterSync,
        receiver: Receiver<RecordMessage>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            model_dir: config.model_dir.clone(),
            eval_interval: config.eval_interval,
            max_global_steps: config.max_global_steps,
            save_interval: config.save_interval,
            record_poll_timeout: Duration::from_millis(config.record_poll_timeout_ms),
            receiver,
            sync,
            stop,
        }
    }

    /// Saves the shared parameters in `{model_dir}/{name}`.
    fn save_params(&self, name: &str) -> Result<Option<PathBuf>> {
        let model_dir = match &self.model_dir {
            Some(d) => Path::new(d).join(name),
            None => return Ok(None),
        };
        std::fs::create_dir_all(&model_dir)?;
        self.sync.pull_sub().save(model_dir.join("sub.bin"))?;
        self.sync.pull_meta().save(model_dir.join("meta.bin"))?;
        self.sync.pull_target().save(model_dir.join("target.bin"))?;
        Ok(Some(model_dir))
    }

    fn save(&self, name: &str) {
        match self.save_params(name) {
            Ok(Some(dir)) => info!("Saved the parameters in {:?}", dir),
            Ok(None) => {}
            Err(e) => warn!("Failed to save the parameters: {:?}", e),
        }
    }

    fn next_multiple(step: u64, interval: u64) -> u64 {
        (step / interval + 1) * interval
    }

    /// Runs the training loop until the global step reaches the maximum or
    /// every worker has exited. The stop flag is raised on return.
    pub fn train<E, P, M>(
        &mut self,
        recorder: &mut impl Recorder,
        evaluator: &mut Evaluator<E, P, M>,
    ) -> Result<AsyncTrainStat>
    where
        E: Env,
        P: FeatureControl<Obs = E::Obs>,
        M: RecurrentPolicy<Obs = E::Obs>,
    {
        let result = self.train_loop(recorder, evaluator);
        self.stop.store(true, Ordering::SeqCst);
        self.save("final");
        result
    }

    fn train_loop<E, P, M>(
        &mut self,
        recorder: &mut impl Recorder,
        evaluator: &mut Evaluator<E, P, M>,
    ) -> Result<AsyncTrainStat>
    where
        E: Env,
        P: FeatureControl<Obs = E::Obs>,
        M: RecurrentPolicy<Obs = E::Obs>,
    {
        let time = Instant::now();
        let mut next_eval = self.eval_interval;
        let mut next_save = self.save_interval;
        let mut n_records = 0;
        let mut n_evals = 0;

        loop {
            match self.receiver.recv_timeout(self.record_poll_timeout) {
                Ok(msg) => {
                    recorder.write(msg.record);
                    n_records += 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("All workers exited");
                    break;
                }
            }

            let step = self.sync.global_step().get();
            if self.eval_interval > 0 && step >= next_eval {
                recorder.write(evaluator.evaluate()?);
                n_evals += 1;
                next_eval = Self::next_multiple(step, self.eval_interval);
            }
            if self.save_interval > 0 && step >= next_save {
                self.save(&step.to_string());
                next_save = Self::next_multiple(step, self.save_interval);
            }
            if step >= self.max_global_steps {
                info!("Reached the maximum global step {}", self.max_global_steps);
                break;
            }
        }

        let duration = time.elapsed();
        let global_step = self.sync.global_step().get();
        Ok(AsyncTrainStat {
            global_step,
            env_steps_per_sec: global_step as f32 / duration.as_secs_f32().max(1e-6),
            n_records,
            n_evals,
            duration,
        })
    }
}
