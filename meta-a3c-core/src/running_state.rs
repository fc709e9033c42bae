use crate::base::PolicyInput;

/// State of a controller carried across rollouts within an episode.
#[derive(Debug, Clone)]
pub struct RunningEpisodeState<O, S> {
    /// Last observation.
    pub obs: O,

    /// Last recurrent state.
    pub state: S,

    /// Last action, one-hot encoded.
    pub action: Vec<f32>,

    /// Last reward.
    pub reward: f32,

    /// Number of steps in the current episode.
    pub length: usize,

    /// Sum of rewards used for training in the current episode.
    pub reward_sum: f32,

    /// Sum of clipped environment rewards in the current episode.
    pub extrinsic_sum: f32,

    /// Sum of intrinsic rewards in the current episode.
    pub intrinsic_sum: f32,
}

impl<O, S> RunningEpisodeState<O, S> {
    /// Constructs the state at the beginning of an episode.
    pub fn new(obs: O, state: S, n_actions: usize) -> Self {
        Self {
            obs,
            state,
            action: vec![0f32; n_actions],
            reward: 0.0,
            length: 0,
            reward_sum: 0.0,
            extrinsic_sum: 0.0,
            intrinsic_sum: 0.0,
        }
    }

    /// Input of the policy at the current step.
    pub fn input<'a>(&'a self, context: Option<&'a [f32]>) -> PolicyInput<'a, O, S> {
        PolicyInput {
            obs: &self.obs,
            state: &self.state,
            prev_action: &self.action,
            prev_reward: self.reward,
            context,
        }
    }

    /// Clears the previous action and reward and the episode statistics.
    pub fn reset_episode_stats(&mut self) {
        self.action.iter_mut().for_each(|a| *a = 0.0);
        self.reward = 0.0;
        self.length = 0;
        self.reward_sum = 0.0;
        self.extrinsic_sum = 0.0;
        self.intrinsic_sum = 0.0;
    }
}
