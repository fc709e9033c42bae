//! Trajectory collection shared by the sub and meta controllers.
use crate::{
    base::RecurrentPolicy,
    running_state::RunningEpisodeState,
    trajectory::{TrajectoryBuffer, Transition},
};
use anyhow::Result;
use log::trace;

/// Outcome of applying an action at one level of the hierarchy.
#[derive(Debug, Clone)]
pub struct LevelStep<O> {
    /// Observation after the action.
    pub obs: O,

    /// Reward used for training.
    pub reward: f32,

    /// Clipped environment reward, without intrinsic reward.
    pub extrinsic: f32,

    /// The episode ended.
    pub is_terminal: bool,
}

/// Transitions collected by [`collect_rollout`].
#[derive(Debug)]
pub struct Rollout<O, S> {
    /// Transitions with the bootstrap value.
    pub buffer: TrajectoryBuffer<O, S>,

    /// The rollout stopped because the episode ended.
    pub terminated: bool,

    /// Sum of extrinsic rewards in the rollout.
    pub extrinsic: f32,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Collects at most `horizon` transitions.
///
/// ```mermaid
/// graph LR
///     RunningEpisodeState --> RecurrentPolicy
///     RecurrentPolicy -- action --> advance
///     advance -- LevelStep --> TrajectoryBuffer
///     advance -- LevelStep --> RunningEpisodeState
/// ```
///
/// `advance` applies the action to the level below (an environment for the
/// sub controller, the sub controller for the meta controller). `running` is
/// updated after every step. On termination the loop stops with the last
/// observation and the episode statistics left in `running`, so that the
/// caller can report them before resetting the episode. The bootstrap value
/// is `0` on termination and the value of the final state otherwise.
pub fn collect_rollout<P, F>(
    policy: &mut P,
    running: &mut RunningEpisodeState<P::Obs, P::State>,
    horizon: usize,
    context: Option<&[f32]>,
    mut advance: F,
) -> Result<Rollout<P::Obs, P::State>>
where
    P: RecurrentPolicy,
    F: FnMut(&mut P, &[f32], &RunningEpisodeState<P::Obs, P::State>) -> Result<LevelStep<P::Obs>>,
{
    let mut buffer = TrajectoryBuffer::new(horizon);
    let mut terminated = false;
    let mut extrinsic = 0f32;

    for _ in 0..horizon {
        let out = policy.act(&running.input(context))?;
        let step = advance(policy, &out.action, running)?;

        buffer.push(Transition {
            obs: running.obs.clone(),
            state_in: running.state.clone(),
            prev_action: running.action.clone(),
            prev_reward: running.reward,
            action: out.action.clone(),
            value: out.value,
            reward: step.reward,
            context: context.map(|c| c.to_vec()),
        })?;

        extrinsic += step.extrinsic;
        running.obs = step.obs;
        running.state = out.state;
        running.action = out.action;
        running.reward = step.reward;
        running.length += 1;
        running.reward_sum += step.reward;
        running.extrinsic_sum += step.extrinsic;

        if step.is_terminal {
            terminated = true;
            break;
        }
    }

    let bootstrap = if terminated {
        0.0
    } else {
        policy.value(&running.input(context))?
    };
    buffer.set_bootstrap(bootstrap);
    trace!(
        "Collected {} transitions, terminated = {}",
        buffer.len(),
        terminated
    );

    Ok(Rollout {
        buffer,
        terminated,
        extrinsic,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        dummy::{DummyEnv, DummyEnvConfig, DummyPolicy, DummyPolicyConfig},
        returns::ReturnEstimator,
        util::argmax,
        Env,
    };

    fn setup(
        episode_len: usize,
    ) -> (DummyEnv, DummyPolicy, RunningEpisodeState<usize, usize>) {
        let config = DummyEnvConfig::default().episode_len(episode_len).reward(1.0);
        let mut env = DummyEnv::build(&config, 0).unwrap();
        let policy = DummyPolicy::new(DummyPolicyConfig::default().value(0.5));
        let obs = env.reset().unwrap();
        let running = RunningEpisodeState::new(obs, policy.initial_state(), 2);
        (env, policy, running)
    }

    #[test]
    fn test_early_termination() -> Result<()> {
        let (mut env, mut policy, mut running) = setup(7);
        let rollout = collect_rollout(&mut policy, &mut running, 100, None, |_, a, _| {
            let step = env.step(argmax(a))?;
            Ok(LevelStep {
                obs: step.obs,
                reward: step.reward,
                extrinsic: step.reward,
                is_terminal: step.is_terminated,
            })
        })?;

        assert!(rollout.terminated);
        assert_eq!(rollout.buffer.len(), 7);
        assert_eq!(rollout.buffer.bootstrap(), 0.0);
        assert_eq!(rollout.extrinsic, 7.0);
        assert_eq!(running.length, 7);
        assert_eq!(running.obs, 7);

        let batch = rollout.buffer.into_batch(&ReturnEstimator::default(), None)?;
        assert_eq!(batch.returns.len(), 7);
        assert_eq!(batch.advantages.len(), 7);
        assert_eq!(batch.obs, (0..7).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_horizon_bootstraps_with_value() -> Result<()> {
        let (mut env, mut policy, mut running) = setup(1000);
        let rollout = collect_rollout(&mut policy, &mut running, 5, None, |_, a, _| {
            let step = env.step(argmax(a))?;
            Ok(LevelStep {
                obs: step.obs,
                reward: step.reward,
                extrinsic: step.reward,
                is_terminal: step.is_terminated,
            })
        })?;

        assert!(!rollout.terminated);
        assert_eq!(rollout.buffer.len(), 5);
        assert_eq!(rollout.buffer.bootstrap(), 0.5);

        // The recurrent state and previous action are carried to the next rollout
        assert_eq!(running.state, 5);
        assert_eq!(running.action, vec![1.0, 0.0]);
        let states = rollout
            .buffer
            .transitions()
            .iter()
            .map(|t| t.state_in)
            .collect::<Vec<_>>();
        assert_eq!(states, vec![0, 1, 2, 3, 4]);
        Ok(())
    }
}
