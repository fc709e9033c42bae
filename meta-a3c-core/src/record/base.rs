use crate::error::MetaA3cError;
use chrono::prelude::{DateTime, Local};
use std::collections::{
    hash_map::{IntoIter, Iter, Keys},
    HashMap,
};

/// Value stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A scalar, used for losses, norms and episode statistics.
    Scalar(f32),

    /// A step count, kept as an integer so that it stays exact.
    Step(u64),

    /// A timestamp.
    DateTime(DateTime<Local>),

    /// A 1-dimensional array, e.g. a feature vector.
    Array1(Vec<f32>),

    /// A text value.
    String(String),
}

/// A set of named values.
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record with a single scalar.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a value.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Consumes the record and returns an iterator over its entries.
    pub fn into_iter_in_record(self) -> IntoIter<String, RecordValue> {
        self.0.into_iter()
    }

    /// Returns the value of the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges two records. Values of `record` overwrite values with the same key.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Merges `record` into `self`.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    /// Returns the scalar of the given key.
    pub fn get_scalar(&self, k: &str) -> Result<f32, MetaA3cError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(MetaA3cError::RecordValueTypeError("Scalar".to_string())),
            None => Err(MetaA3cError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the step count of the given key.
    pub fn get_step(&self, k: &str) -> Result<u64, MetaA3cError> {
        match self.0.get(k) {
            Some(RecordValue::Step(v)) => Ok(*v),
            Some(_) => Err(MetaA3cError::RecordValueTypeError("Step".to_string())),
            None => Err(MetaA3cError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the 1-dimensional array of the given key.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, MetaA3cError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(MetaA3cError::RecordValueTypeError("Array1".to_string())),
            None => Err(MetaA3cError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the string of the given key.
    pub fn get_string(&self, k: &str) -> Result<String, MetaA3cError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(MetaA3cError::RecordValueTypeError("String".to_string())),
            None => Err(MetaA3cError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns `true` if the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_merge_overwrites() {
        let r1 = Record::from_slice(&[
            ("a", RecordValue::Scalar(1.0)),
            ("b", RecordValue::Scalar(2.0)),
        ]);
        let r2 = Record::from_scalar("b", 3.0);
        let r = r1.merge(r2);
        assert_eq!(r.len(), 2);
        assert_eq!(r.get_scalar("b").unwrap(), 3.0);
    }

    #[test]
    fn test_get_scalar_errors() {
        let mut r = Record::empty();
        r.insert("s", RecordValue::String("x".into()));
        assert!(matches!(
            r.get_scalar("s"),
            Err(MetaA3cError::RecordValueTypeError(_))
        ));
        assert!(matches!(
            r.get_scalar("missing"),
            Err(MetaA3cError::RecordKeyError(_))
        ));
    }

    #[test]
    fn test_step_is_exact_beyond_f32_precision() {
        let step = (1u64 << 24) + 1;
        let r = Record::from_slice(&[("global_step", RecordValue::Step(step))]);
        assert_eq!(r.get_step("global_step").unwrap(), 16_777_217);
        assert!(r.get_scalar("global_step").is_err());
    }
}
