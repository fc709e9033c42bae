use std::time::Duration;
/// Stats of [`AsyncTrainer`](crate::AsyncTrainer)`::train()`.
pub struct AsyncTrainStat {
    /// The global step at the end of training.
    pub global_step: u64,

    /// The number of environment steps of all workers per second.
    pub env_steps_per_sec: f32,

    /// The number of records received from workers.
    pub n_records: usize,

    /// The number of evaluations.
    pub n_evals: usize,

    /// Duration of training.
    pub duration: Duration,
}

impl AsyncTrainStat {
    /// Returns a formatted string.
    pub fn fmt(&self) -> String {
        let mut s = "global steps, env_steps/sec, records, evaluations, duration\n".to_string();
        s += format!(
            "{}, {}, {}, {}, {}\n",
            self.global_step,
            self.env_steps_per_sec,
            self.n_records,
            self.n_evals,
            self.duration.as_secs_f32()
        )
        .as_str();
        s
    }
}
