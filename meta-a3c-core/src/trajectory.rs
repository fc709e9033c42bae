//! Trajectories collected by controllers and batches built from them.
use crate::{error::MetaA3cError, returns::ReturnEstimator};
use anyhow::Result;

/// A single step of interaction recorded by a controller.
#[derive(Debug, Clone)]
pub struct Transition<O, S> {
    /// Observation before the action.
    pub obs: O,

    /// Recurrent state before the action.
    pub state_in: S,

    /// Action of the previous step.
    pub prev_action: Vec<f32>,

    /// Reward of the previous step.
    pub prev_reward: f32,

    /// Action taken, one-hot encoded.
    pub action: Vec<f32>,

    /// Value estimate of the observation.
    pub value: f32,

    /// Reward received for the action.
    pub reward: f32,

    /// Option active during the step.
    pub context: Option<Vec<f32>>,
}

/// Transitions of a single rollout with the bootstrap value.
#[derive(Debug, Clone)]
pub struct TrajectoryBuffer<O, S> {
    transitions: Vec<Transition<O, S>>,
    horizon: usize,
    bootstrap: f32,
}

impl<O, S> TrajectoryBuffer<O, S> {
    /// Constructs an empty buffer holding at most `horizon` transitions.
    pub fn new(horizon: usize) -> Self {
        Self {
            transitions: Vec::with_capacity(horizon),
            horizon,
            bootstrap: 0.0,
        }
    }

    /// Appends a transition.
    pub fn push(&mut self, transition: Transition<O, S>) -> Result<()> {
        if self.transitions.len() >= self.horizon {
            return Err(MetaA3cError::TrajectoryOverflow(self.horizon).into());
        }
        self.transitions.push(transition);
        Ok(())
    }

    /// The number of transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns `true` if the buffer has no transitions.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// The maximum number of transitions.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Sets the value of the state following the last transition.
    pub fn set_bootstrap(&mut self, value: f32) {
        self.bootstrap = value;
    }

    /// Value of the state following the last transition.
    pub fn bootstrap(&self) -> f32 {
        self.bootstrap
    }

    /// Rewards of the transitions.
    pub fn rewards(&self) -> Vec<f32> {
        self.transitions.iter().map(|t| t.reward).collect()
    }

    /// Transitions in time order.
    pub fn transitions(&self) -> &[Transition<O, S>] {
        &self.transitions
    }

    /// Consumes the buffer and builds a batch for a gradient step.
    ///
    /// If `context` is given, it is used as the option of every transition.
    pub fn into_batch(
        self,
        estimator: &ReturnEstimator,
        context: Option<Vec<f32>>,
    ) -> Result<TrainingBatch<O, S>> {
        if self.transitions.is_empty() {
            return Err(MetaA3cError::EmptyTrajectory.into());
        }

        let rewards = self.rewards();
        let values = self.transitions.iter().map(|t| t.value).collect::<Vec<_>>();
        let est = estimator.estimate(&rewards, &values, self.bootstrap);
        let n = self.transitions.len();

        let mut state_in = None;
        let mut obs = Vec::with_capacity(n);
        let mut actions = Vec::with_capacity(n);
        let mut prev_actions = Vec::with_capacity(n);
        let mut prev_rewards = Vec::with_capacity(n);
        let mut own_contexts = Vec::with_capacity(n);
        for t in self.transitions {
            if state_in.is_none() {
                state_in = Some(t.state_in);
            }
            obs.push(t.obs);
            actions.push(t.action);
            prev_actions.push(t.prev_action);
            prev_rewards.push(t.prev_reward);
            own_contexts.push(t.context);
        }
        let state_in = state_in.ok_or(MetaA3cError::EmptyTrajectory)?;
        let contexts = match context {
            Some(c) => Some(vec![c; n]),
            None => own_contexts.into_iter().collect::<Option<Vec<_>>>(),
        };

        Ok(TrainingBatch {
            obs,
            actions,
            advantages: est.advantages,
            returns: est.returns,
            state_in,
            prev_actions,
            prev_rewards,
            contexts,
            rewards,
        })
    }
}

/// Inputs and targets of a gradient step.
///
/// All vectors have one entry per transition. The recurrent policy is unrolled
/// from `state_in`, the state before the first transition.
#[derive(Debug, Clone)]
pub struct TrainingBatch<O, S> {
    /// Observations.
    pub obs: Vec<O>,

    /// Actions taken, one-hot encoded.
    pub actions: Vec<Vec<f32>>,

    /// Advantages.
    pub advantages: Vec<f32>,

    /// Discounted returns.
    pub returns: Vec<f32>,

    /// Recurrent state before the first transition.
    pub state_in: S,

    /// Previous actions.
    pub prev_actions: Vec<Vec<f32>>,

    /// Previous rewards.
    pub prev_rewards: Vec<f32>,

    /// Options, if the policy is conditioned on them.
    pub contexts: Option<Vec<Vec<f32>>>,

    /// Rewards used to compute the targets.
    pub rewards: Vec<f32>,
}

impl<O, S> TrainingBatch<O, S> {
    /// The number of transitions.
    pub fn len(&self) -> usize {
        self.obs.len()
    }

    /// Returns `true` if the batch has no transitions.
    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn transition(i: usize, reward: f32) -> Transition<usize, usize> {
        Transition {
            obs: i,
            state_in: i,
            prev_action: vec![0.0, 0.0],
            prev_reward: 0.0,
            action: vec![1.0, 0.0],
            value: 0.0,
            reward,
            context: None,
        }
    }

    #[test]
    fn test_empty_buffer_is_rejected() {
        let buf = TrajectoryBuffer::<usize, usize>::new(3);
        let err = buf.into_batch(&ReturnEstimator::default(), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MetaA3cError>(),
            Some(MetaA3cError::EmptyTrajectory)
        ));
    }

    #[test]
    fn test_overflow() {
        let mut buf = TrajectoryBuffer::new(2);
        buf.push(transition(0, 0.0)).unwrap();
        buf.push(transition(1, 0.0)).unwrap();
        assert!(buf.push(transition(2, 0.0)).is_err());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_batch_broadcasts_context() {
        let mut buf = TrajectoryBuffer::new(5);
        for i in 0..3 {
            buf.push(transition(i, 1.0)).unwrap();
        }
        buf.set_bootstrap(0.5);
        let batch = buf
            .into_batch(&ReturnEstimator::default(), Some(vec![0.0, 1.0]))
            .unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.state_in, 0);
        assert_eq!(batch.obs, vec![0, 1, 2]);
        assert_eq!(batch.advantages.len(), 3);
        assert_eq!(batch.returns.len(), 3);
        let contexts = batch.contexts.unwrap();
        assert_eq!(contexts.len(), 3);
        assert!(contexts.iter().all(|c| c == &vec![0.0, 1.0]));
    }

    #[test]
    fn test_batch_without_context() {
        let mut buf = TrajectoryBuffer::new(5);
        buf.push(transition(0, 1.0)).unwrap();
        let batch = buf.into_batch(&ReturnEstimator::default(), None).unwrap();
        assert!(batch.contexts.is_none());
        assert_eq!(batch.returns, vec![1.0]);
    }
}
