//! Parameters shared by worker threads.
use anyhow::Result;
use log::trace;
use meta_a3c_core::{
    error::MetaA3cError,
    params::{ParameterLayout, ParameterSet},
    FeatureControl, GradientOptimizer, RecurrentPolicy,
};
use std::sync::{
    atomic::{AtomicU32, AtomicU64, Ordering},
    Arc,
};

/// Parameters updated by workers without locking.
///
/// Each value is stored as the bits of an `f32` in an [`AtomicU32`]. A pull
/// may observe a mix of old and new values when another worker is pushing.
pub struct ParameterStore {
    layout: ParameterLayout,
    values: Vec<AtomicU32>,
}

impl ParameterStore {
    /// Creates a store initialized with the given parameters.
    pub fn new(params: &ParameterSet) -> Self {
        Self {
            layout: params.layout.clone(),
            values: params
                .values
                .iter()
                .map(|v| AtomicU32::new(v.to_bits()))
                .collect(),
        }
    }

    /// Layout of the parameters.
    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    /// The number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the store has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies the current values.
    pub fn pull(&self) -> ParameterSet {
        ParameterSet {
            layout: self.layout.clone(),
            values: self
                .values
                .iter()
                .map(|v| f32::from_bits(v.load(Ordering::Relaxed)))
                .collect(),
        }
    }

    /// Adds `delta` to the values.
    pub fn add(&self, delta: &[f32]) -> Result<()> {
        self.check_len(delta.len())?;
        for (cell, d) in self.values.iter().zip(delta.iter()) {
            atomic_add(cell, *d);
        }
        Ok(())
    }

    /// Applies the update computed by the optimizer of a worker from `grad`.
    pub fn push<O: GradientOptimizer>(&self, grad: &[f32], opt: &mut O) -> Result<()> {
        self.check_len(grad.len())?;
        let delta = opt.update(grad)?;
        self.add(&delta)
    }

    /// Overwrites the values with those of `src` having the same names.
    ///
    /// Every entry of this store must exist in `src` with the same length.
    pub fn assign_prefix(&self, src: &ParameterStore) -> Result<()> {
        let mut offset = 0;
        for (name, len) in self.layout.entries() {
            let range = src
                .layout
                .range(name)
                .ok_or_else(|| MetaA3cError::UnknownParameter(name.clone()))?;
            if range.len() != *len {
                return Err(MetaA3cError::ParameterLayoutMismatch {
                    expected: *len,
                    actual: range.len(),
                }
                .into());
            }
            for (dst, s) in self.values[offset..offset + len]
                .iter()
                .zip(src.values[range].iter())
            {
                dst.store(s.load(Ordering::Relaxed), Ordering::Relaxed);
            }
            offset += len;
        }
        trace!("Assigned {} values", offset);
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.values.len() {
            return Err(MetaA3cError::ParameterLayoutMismatch {
                expected: self.values.len(),
                actual: len,
            }
            .into());
        }
        Ok(())
    }
}

fn atomic_add(cell: &AtomicU32, d: f32) {
    // The closure never returns None
    let _ = cell.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
        Some((f32::from_bits(bits) + d).to_bits())
    });
}

/// The number of environment steps used for sub-level updates by all workers.
#[derive(Debug, Default)]
pub struct GlobalStep(AtomicU64);

impl GlobalStep {
    /// Creates a counter starting from zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Adds `n` and returns the new value.
    pub fn add(&self, n: u64) -> u64 {
        self.0.fetch_add(n, Ordering::SeqCst) + n
    }
}

/// Handles to the shared parameters of both levels.
///
/// Cloning gives another handle to the same stores.
#[derive(Clone)]
pub struct ParameterSync {
    sub: Arc<ParameterStore>,
    meta: Arc<ParameterStore>,
    target: Arc<ParameterStore>,
    global_step: Arc<GlobalStep>,
}

impl ParameterSync {
    /// Creates shared stores from initial parameters.
    ///
    /// The target feature network is initialized with the entries of `sub`
    /// whose names start with `feature_prefix`.
    pub fn new(sub: &ParameterSet, meta: &ParameterSet, feature_prefix: &str) -> Self {
        let target = sub.filter_prefix(feature_prefix);
        Self {
            sub: Arc::new(ParameterStore::new(sub)),
            meta: Arc::new(ParameterStore::new(meta)),
            target: Arc::new(ParameterStore::new(&target)),
            global_step: Arc::new(GlobalStep::new()),
        }
    }

    /// Creates shared stores from saved parameters, including the target
    /// feature network.
    ///
    /// Every entry of `target` must exist in `sub` with the same length.
    pub fn from_sets(
        sub: &ParameterSet,
        meta: &ParameterSet,
        target: &ParameterSet,
    ) -> Result<Self> {
        for (name, len) in target.layout.entries() {
            let range = sub
                .layout
                .range(name)
                .ok_or_else(|| MetaA3cError::UnknownParameter(name.clone()))?;
            if range.len() != *len {
                return Err(MetaA3cError::ParameterLayoutMismatch {
                    expected: range.len(),
                    actual: *len,
                }
                .into());
            }
        }
        Ok(Self {
            sub: Arc::new(ParameterStore::new(sub)),
            meta: Arc::new(ParameterStore::new(meta)),
            target: Arc::new(ParameterStore::new(target)),
            global_step: Arc::new(GlobalStep::new()),
        })
    }

    /// Creates shared stores from the parameters of policies.
    pub fn from_policies<P, M>(policy: &P, meta_policy: &M) -> Result<Self>
    where
        P: FeatureControl,
        M: RecurrentPolicy,
    {
        Ok(Self::new(
            &policy.params()?,
            &meta_policy.params()?,
            policy.feature_prefix(),
        ))
    }

    /// Current parameters of the sub policy.
    pub fn pull_sub(&self) -> ParameterSet {
        self.sub.pull()
    }

    /// Current parameters of the meta policy.
    pub fn pull_meta(&self) -> ParameterSet {
        self.meta.pull()
    }

    /// Current parameters of the target feature network.
    pub fn pull_target(&self) -> ParameterSet {
        self.target.pull()
    }

    /// Updates the sub policy.
    pub fn push_sub<O: GradientOptimizer>(&self, grad: &[f32], opt: &mut O) -> Result<()> {
        self.sub.push(grad, opt)
    }

    /// Updates the meta policy.
    pub fn push_meta<O: GradientOptimizer>(&self, grad: &[f32], opt: &mut O) -> Result<()> {
        self.meta.push(grad, opt)
    }

    /// Copies the feature network of the sub policy to the target feature network.
    pub fn sync_target(&self) -> Result<()> {
        self.target.assign_prefix(&self.sub)
    }

    /// The shared global step.
    pub fn global_step(&self) -> &GlobalStep {
        &self.global_step
    }

    /// Another handle to the shared global step.
    pub fn shared_global_step(&self) -> Arc<GlobalStep> {
        self.global_step.clone()
    }

    /// Store of the sub policy.
    pub fn sub(&self) -> &ParameterStore {
        &self.sub
    }

    /// Store of the meta policy.
    pub fn meta(&self) -> &ParameterStore {
        &self.meta
    }

    /// Store of the target feature network.
    pub fn target(&self) -> &ParameterStore {
        &self.target
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use meta_a3c_core::dummy::{DummySgd, DummySgdConfig};
    use std::thread;

    fn params() -> ParameterSet {
        ParameterSet::new(
            ParameterLayout::new(vec![
                ("feature.weight".to_string(), 2),
                ("policy.weight".to_string(), 3),
            ]),
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
        )
        .unwrap()
    }

    #[test]
    fn test_push_applies_optimizer_update() -> Result<()> {
        let store = ParameterStore::new(&params());
        let mut opt = DummySgd::build(&DummySgdConfig { lr: 0.5 }, store.len())?;
        store.push(&[2.0; 5], &mut opt)?;
        assert_eq!(store.pull().values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(store.push(&[1.0; 4], &mut opt).is_err());
        Ok(())
    }

    #[test]
    fn test_sync_target() -> Result<()> {
        let sync = ParameterSync::new(&params(), &params(), "feature");
        assert_eq!(sync.pull_target().values, vec![1.0, 2.0]);

        sync.sub().add(&[1.0; 5])?;
        assert_eq!(sync.pull_target().values, vec![1.0, 2.0]);
        sync.sync_target()?;
        assert_eq!(sync.pull_target().values, vec![2.0, 3.0]);
        assert_eq!(sync.pull_meta().values, params().values);
        Ok(())
    }

    #[test]
    fn test_from_sets_keeps_saved_target() -> Result<()> {
        let target = ParameterSet::new(
            ParameterLayout::new(vec![("feature.weight".to_string(), 2)]),
            vec![9.0, 9.0],
        )?;
        let sync = ParameterSync::from_sets(&params(), &params(), &target)?;
        assert_eq!(sync.pull_target(), target);
        assert_eq!(sync.pull_sub().get("feature.weight")?, &[1.0, 2.0]);

        let unknown = ParameterSet::new(
            ParameterLayout::new(vec![("other.weight".to_string(), 2)]),
            vec![0.0, 0.0],
        )?;
        assert!(ParameterSync::from_sets(&params(), &params(), &unknown).is_err());
        let short = ParameterSet::new(
            ParameterLayout::new(vec![("feature.weight".to_string(), 1)]),
            vec![0.0],
        )?;
        assert!(ParameterSync::from_sets(&params(), &params(), &short).is_err());
        Ok(())
    }

    #[test]
    fn test_concurrent_global_step() {
        let step = Arc::new(GlobalStep::new());
        let handles = (0..8)
            .map(|_| {
                let step = step.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        step.add(3);
                    }
                })
            })
            .collect::<Vec<_>>();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(step.get(), 8 * 1000 * 3);
    }

    #[test]
    fn test_concurrent_add_loses_no_update() -> Result<()> {
        let store = Arc::new(ParameterStore::new(&params()));
        let handles = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        store.add(&[1.0; 5]).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.pull().values, vec![1001.0, 1002.0, 1003.0, 1004.0, 1005.0]);
        Ok(())
    }
}
