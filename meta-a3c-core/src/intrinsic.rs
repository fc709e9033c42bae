//! Intrinsic reward from the drift of features and reward shaping.
use serde::{Deserialize, Serialize};

/// Fraction of the change of the features concentrated on the entry `idx`.
///
/// `|curr[idx] - prev[idx]| / (Σ_j |curr[j] - prev[j]| + eps)`, which lies in
/// `[0, 1]` for `eps > 0`.
pub fn selectivity(curr: &[f32], prev: &[f32], idx: usize, eps: f32) -> f32 {
    let num = (curr[idx] - prev[idx]).abs();
    let den = curr
        .iter()
        .zip(prev.iter())
        .map(|(c, p)| (c - p).abs())
        .sum::<f32>()
        + eps;
    num / den
}

/// Rewards the sub controller for changing the feature selected by the option.
#[derive(Debug, Clone)]
pub struct IntrinsicRewardModule {
    scale: f32,
    eps: f32,
    prev: Vec<f32>,
}

impl IntrinsicRewardModule {
    /// Constructs the module for features of length `dim`.
    pub fn new(dim: usize, scale: f32, eps: f32) -> Self {
        Self {
            scale,
            eps,
            prev: vec![0f32; dim],
        }
    }

    /// Sets the previous features to zeros.
    pub fn reset(&mut self) {
        self.prev.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Returns the previous features.
    pub fn prev(&self) -> &[f32] {
        &self.prev
    }

    /// Computes the intrinsic reward of `features` and stores them as the
    /// previous features.
    pub fn compute(&mut self, features: &[f32], idx: usize) -> f32 {
        if self.prev.len() != features.len() {
            self.prev = vec![0f32; features.len()];
        }
        let r = self.scale * selectivity(features, &self.prev, idx, self.eps);
        self.prev.copy_from_slice(features);
        r
    }
}

/// Blends clipped environment rewards with intrinsic rewards.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RewardShaper {
    /// Weight of the environment reward.
    pub beta: f32,

    /// Environment rewards are clipped to `[-clip, clip]`.
    pub clip: f32,
}

impl Default for RewardShaper {
    fn default() -> Self {
        Self {
            beta: 0.75,
            clip: 1.0,
        }
    }
}

impl RewardShaper {
    /// Clips an environment reward.
    pub fn clip(&self, reward: f32) -> f32 {
        reward.clamp(-self.clip, self.clip)
    }

    /// Returns `beta * clipped + (1 - beta) * intrinsic`.
    pub fn shape(&self, clipped: f32, intrinsic: f32) -> f32 {
        self.beta * clipped + (1.0 - self.beta) * intrinsic
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_selectivity_in_unit_interval() {
        let cases: [(&[f32], &[f32]); 4] = [
            (&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0]),
            (&[1.0, 0.0, 0.0], &[0.0, 0.0, 0.0]),
            (&[3.0, -2.0, 5.0], &[-1.0, 4.0, 0.5]),
            (&[1e6, 1e-6, -1e6], &[0.0, 0.0, 0.0]),
        ];
        for (curr, prev) in cases.iter() {
            for idx in 0..3 {
                let s = selectivity(curr, prev, idx, 1e-5);
                assert!((0.0..=1.0).contains(&s), "{}", s);
            }
        }
    }

    #[test]
    fn test_selectivity_single_change() {
        let s = selectivity(&[0.0, 2.0], &[0.0, 0.0], 1, 1e-5);
        assert!((s - 1.0).abs() < 1e-4);
        let s = selectivity(&[0.0, 2.0], &[0.0, 0.0], 0, 1e-5);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_module_keeps_previous_features() {
        let mut m = IntrinsicRewardModule::new(2, 0.05, 1e-5);
        let r = m.compute(&[1.0, 0.0], 0);
        assert!((r - 0.05).abs() < 1e-4);
        assert_eq!(m.prev(), &[1.0, 0.0]);

        // No drift, no reward
        let r = m.compute(&[1.0, 0.0], 0);
        assert_eq!(r, 0.0);

        m.reset();
        assert_eq!(m.prev(), &[0.0, 0.0]);
    }

    #[test]
    fn test_shaped_reward_bounds() {
        let shaper = RewardShaper::default();
        let c = 0.05;
        for env_reward in [-10.0, -1.0, -0.3, 0.0, 0.4, 1.0, 7.0] {
            for sel in [0.0, 0.25, 0.5, 1.0] {
                let shaped = shaper.shape(shaper.clip(env_reward), c * sel);
                assert!(shaped >= -shaper.beta - 1e-6);
                assert!(shaped <= shaper.beta + (1.0 - shaper.beta) * c + 1e-6);
            }
        }
    }
}
