use std::time::Duration;

/// Stats of a worker thread.
#[derive(Clone, Debug)]
pub struct ActorStat {
    /// The number of environment steps taken by the worker.
    pub env_steps: usize,

    /// The number of sub-level updates.
    pub sub_updates: usize,

    /// The number of meta-level updates.
    pub meta_updates: usize,

    /// The number of finished episodes.
    pub episodes: usize,

    /// Duration of the training loop of the worker.
    pub duration: Duration,
}

/// Returns a formatted string of the set of [`ActorStat`] for reporting.
pub fn actor_stats_fmt(stats: &[ActorStat]) -> String {
    let mut s = "worker id, env steps, episodes, sub updates, meta updates, duration [sec], env steps per sec\n".to_string();
    for (i, stat) in stats.iter().enumerate() {
        let n = stat.env_steps;
        let d = stat.duration.as_secs_f32();
        let p = if d > 0.0 { (n as f32) / d } else { 0.0 };
        s += format!(
            "{}, {}, {}, {}, {}, {}, {}\n",
            i, n, stat.episodes, stat.sub_updates, stat.meta_updates, d, p
        )
        .as_str();
    }
    s
}
