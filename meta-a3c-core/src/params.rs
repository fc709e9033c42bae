//! Flat, named parameter vectors.
//!
//! Backends flatten their trainable tensors into a single `Vec<f32>` in the
//! order of a [`ParameterLayout`]. Shared stores, gradients and optimizers
//! only see the flat vector.
use crate::error::MetaA3cError;
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    ops::Range,
    path::Path,
};

/// Ordered names and lengths of parameter tensors.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ParameterLayout(Vec<(String, usize)>);

impl ParameterLayout {
    /// Constructs a layout from `(name, len)` entries.
    pub fn new(entries: Vec<(String, usize)>) -> Self {
        Self(entries)
    }

    /// Entries in order.
    pub fn entries(&self) -> &[(String, usize)] {
        &self.0
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.0.iter().map(|(_, n)| n).sum()
    }

    /// Returns `true` if the layout has no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Range of the values of the named parameter in the flat vector.
    pub fn range(&self, name: &str) -> Option<Range<usize>> {
        let mut offset = 0;
        for (n, len) in self.0.iter() {
            if n == name {
                return Some(offset..offset + len);
            }
            offset += len;
        }
        None
    }

    /// Entries under the path `prefix`, i.e. named `prefix` or `prefix.*`.
    pub fn filter_prefix(&self, prefix: &str) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(n, _)| has_path_prefix(n, prefix))
                .cloned()
                .collect(),
        )
    }
}

fn has_path_prefix(name: &str, prefix: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// A snapshot of parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ParameterSet {
    /// Layout of `values`.
    pub layout: ParameterLayout,

    /// Flat values.
    pub values: Vec<f32>,
}

impl ParameterSet {
    /// Constructs a parameter set, checking the number of values.
    pub fn new(layout: ParameterLayout, values: Vec<f32>) -> Result<Self> {
        if layout.len() != values.len() {
            return Err(MetaA3cError::ParameterLayoutMismatch {
                expected: layout.len(),
                actual: values.len(),
            }
            .into());
        }
        Ok(Self { layout, values })
    }

    /// Values of the named parameter.
    pub fn get(&self, name: &str) -> Result<&[f32]> {
        let range = self
            .layout
            .range(name)
            .ok_or_else(|| MetaA3cError::UnknownParameter(name.to_string()))?;
        Ok(&self.values[range])
    }

    /// Parameters under the path `prefix`.
    pub fn filter_prefix(&self, prefix: &str) -> Self {
        let layout = self.layout.filter_prefix(prefix);
        let mut values = Vec::with_capacity(layout.len());
        for (name, _) in layout.entries() {
            if let Some(r) = self.layout.range(name) {
                values.extend_from_slice(&self.values[r]);
            }
        }
        Self { layout, values }
    }

    /// L2 norm of all values.
    pub fn global_norm(&self) -> f32 {
        global_norm(&self.values)
    }

    /// Saves the parameters.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = BufWriter::new(File::create(path)?);
        bincode::serialize_into(file, self)?;
        info!("Saved parameters to {:?}", path);
        Ok(())
    }

    /// Loads parameters.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);
        let params: Self = bincode::deserialize_from(file)?;
        info!("Loaded parameters from {:?}", path);
        Ok(params)
    }
}

/// L2 norm of a vector.
pub fn global_norm(x: &[f32]) -> f32 {
    x.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Scales `grad` by `max_norm / max(norm, max_norm)` and returns the norm
/// before clipping.
pub fn clip_by_global_norm(grad: &mut [f32], max_norm: f32) -> f32 {
    let norm = global_norm(grad);
    if norm > max_norm {
        let scale = max_norm / norm;
        grad.iter_mut().for_each(|g| *g *= scale);
    }
    norm
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    fn layout() -> ParameterLayout {
        ParameterLayout::new(vec![
            ("feature.fc0.weight".into(), 4),
            ("feature.fc0.bias".into(), 2),
            ("policy.weight".into(), 3),
        ])
    }

    #[test]
    fn test_layout() {
        let l = layout();
        assert_eq!(l.len(), 9);
        assert_eq!(l.range("feature.fc0.bias"), Some(4..6));
        assert_eq!(l.range("policy.weight"), Some(6..9));
        assert_eq!(l.range("value.weight"), None);
        assert_eq!(l.filter_prefix("feature").len(), 6);
    }

    #[test]
    fn test_mismatch() {
        assert!(ParameterSet::new(layout(), vec![0.0; 8]).is_err());
    }

    #[test]
    fn test_filter_prefix() {
        let values = (0..9).map(|v| v as f32).collect();
        let p = ParameterSet::new(layout(), values).unwrap();
        let f = p.filter_prefix("feature");
        assert_eq!(f.values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(p.get("policy.weight").unwrap(), &[6.0, 7.0, 8.0]);
        assert!(p.get("value.weight").is_err());
    }

    #[test]
    fn test_filter_prefix_matches_whole_path_segment() {
        let l = ParameterLayout::new(vec![
            ("feature.ln0.weight".to_string(), 2),
            ("features_head.weight".to_string(), 3),
            ("feature".to_string(), 1),
        ]);
        let f = l.filter_prefix("feature");
        assert_eq!(f.len(), 3);
        assert_eq!(f.range("features_head.weight"), None);
    }

    #[test]
    fn test_clip_by_global_norm() {
        let mut g = vec![30.0, 40.0];
        let norm = clip_by_global_norm(&mut g, 40.0);
        assert_eq!(norm, 50.0);
        assert!((global_norm(&g) - 40.0).abs() < 1e-4);

        let mut g = vec![3.0, 4.0];
        clip_by_global_norm(&mut g, 40.0);
        assert_eq!(g, vec![3.0, 4.0]);
    }

    #[test]
    fn test_save_load() -> Result<()> {
        let tmp = TempDir::new("params")?;
        let path = tmp.path().join("sub.bin");
        let p = ParameterSet::new(layout(), vec![0.5; 9])?;
        p.save(&path)?;
        assert_eq!(ParameterSet::load(&path)?, p);
        Ok(())
    }
}
