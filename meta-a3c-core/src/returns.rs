//! Discounted returns and generalized advantage estimation.
//!
//! `A_t = Σ_l (γλ)^l δ_{t+l}` where `δ_t = r_t + γ V(s_{t+1}) - V(s_t)`.
//! Returns are discounted sums of rewards with the bootstrap value appended.
use serde::{Deserialize, Serialize};

/// Computes `y[t] = x[t] + gamma * y[t + 1]` backwards from the last element.
pub fn discount(x: &[f32], gamma: f32) -> Vec<f32> {
    let mut y = vec![0f32; x.len()];
    let mut acc = 0f32;
    for t in (0..x.len()).rev() {
        acc = x[t] + gamma * acc;
        y[t] = acc;
    }
    y
}

/// Returns and advantages of a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimates {
    /// Discounted returns.
    pub returns: Vec<f32>,

    /// Advantages.
    pub advantages: Vec<f32>,
}

/// Computes returns and advantages of a trajectory.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReturnEstimator {
    /// Discount factor.
    pub gamma: f32,

    /// Parameter of generalized advantage estimation.
    pub lambda: f32,
}

impl Default for ReturnEstimator {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            lambda: 1.0,
        }
    }
}

impl ReturnEstimator {
    /// Constructs the estimator.
    pub fn new(gamma: f32, lambda: f32) -> Self {
        Self { gamma, lambda }
    }

    /// Estimates returns and advantages.
    ///
    /// `values[t]` is the value estimate at step `t` and `bootstrap` is the
    /// value of the state following the last step, `0` if the episode ended.
    /// `rewards` and `values` must have the same length.
    pub fn estimate(&self, rewards: &[f32], values: &[f32], bootstrap: f32) -> Estimates {
        debug_assert_eq!(rewards.len(), values.len());
        let n = rewards.len();

        let mut rewards_plus = rewards.to_vec();
        rewards_plus.push(bootstrap);
        let mut returns = discount(&rewards_plus, self.gamma);
        returns.truncate(n);

        let deltas = (0..n)
            .map(|t| {
                let next = if t + 1 < n { values[t + 1] } else { bootstrap };
                rewards[t] + self.gamma * next - values[t]
            })
            .collect::<Vec<_>>();
        let advantages = discount(&deltas, self.gamma * self.lambda);

        Estimates {
            returns,
            advantages,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-5, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_discount() {
        assert_close(&discount(&[1.0, 1.0, 1.0], 0.5), &[1.75, 1.5, 1.0]);
        assert_close(&discount(&[0.0, 0.0, 1.0], 0.99), &[0.9801, 0.99, 1.0]);
        assert!(discount(&[], 0.99).is_empty());
    }

    #[test]
    fn test_returns_include_bootstrap() {
        let est = ReturnEstimator::new(0.5, 1.0);
        let e = est.estimate(&[1.0, 1.0], &[0.0, 0.0], 4.0);
        // [1 + 0.5 * (1 + 0.5 * 4), 1 + 0.5 * 4]
        assert_close(&e.returns, &[2.5, 3.0]);
    }

    #[test]
    fn test_advantage_vanishes_for_exact_values() {
        let est = ReturnEstimator::default();
        let rewards = [0.3, -0.2, 1.0, 0.0, 0.5];
        let bootstrap = 0.7;
        let exact = est.estimate(&rewards, &[0.0; 5], bootstrap).returns;
        let e = est.estimate(&rewards, &exact, bootstrap);
        for a in e.advantages.iter() {
            assert!(a.abs() < 1e-5);
        }
    }

    #[test]
    fn test_lambda_one_advantage_is_return_minus_value() {
        let est = ReturnEstimator::new(0.9, 1.0);
        let rewards = [1.0, 0.0, -1.0];
        let values = [0.5, 0.2, -0.3];
        let e = est.estimate(&rewards, &values, 0.1);
        let expected = e
            .returns
            .iter()
            .zip(values.iter())
            .map(|(r, v)| r - v)
            .collect::<Vec<_>>();
        assert_close(&e.advantages, &expected);
    }

    #[test]
    fn test_empty() {
        let e = ReturnEstimator::default().estimate(&[], &[], 1.0);
        assert!(e.returns.is_empty());
        assert!(e.advantages.is_empty());
    }
}
