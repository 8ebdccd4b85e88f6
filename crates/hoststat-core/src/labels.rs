//! Label sets attached to measurements.
//!
//! A [`LabelSet`] is a plain value: adding dimensions produces a new set and
//! never touches the one it was derived from. Collectors build a fresh set per
//! measurement from the base labels, so no two measurements (or two
//! concurrent collection passes) share a mutable label container.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

/// Scalar label value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::Int(v) => write!(f, "{}", v),
            LabelValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for LabelValue {
    fn from(s: &str) -> Self {
        LabelValue::Str(s.to_string())
    }
}

impl From<String> for LabelValue {
    fn from(s: String) -> Self {
        LabelValue::Str(s)
    }
}

impl From<i64> for LabelValue {
    fn from(v: i64) -> Self {
        LabelValue::Int(v)
    }
}

impl From<u32> for LabelValue {
    fn from(v: u32) -> Self {
        LabelValue::Int(i64::from(v))
    }
}

impl From<usize> for LabelValue {
    fn from(v: usize) -> Self {
        LabelValue::Int(v as i64)
    }
}

/// Mapping from label key to value, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, LabelValue>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this set with `key` set to `value`.
    pub fn with(&self, key: impl Into<String>, value: impl Into<LabelValue>) -> Self {
        let mut labels = self.clone();
        labels.0.insert(key.into(), value.into());
        labels
    }

    /// Returns a copy of this set extended with `dimensions`.
    ///
    /// Dimensions override base keys of the same name.
    pub fn extend<K, V>(&self, dimensions: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<LabelValue>,
    {
        let mut labels = self.clone();
        for (key, value) in dimensions {
            labels.0.insert(key.into(), value.into());
        }
        labels
    }

    pub fn get(&self, key: &str) -> Option<&LabelValue> {
        self.0.get(key)
    }

    /// Convenience accessor for string-valued labels.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(LabelValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabelValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Order-independent digest of the set's contents.
    ///
    /// Entries are hashed in key order, so two sets with equal contents always
    /// produce the same digest regardless of insertion order.
    pub fn digest(&self) -> u64 {
        let mut hasher = Xxh3::new();
        for (key, value) in &self.0 {
            hasher.update(key.as_bytes());
            hasher.update(&[0]);
            match value {
                LabelValue::Int(v) => {
                    hasher.update(b"i");
                    hasher.update(&v.to_le_bytes());
                }
                LabelValue::Str(s) => {
                    hasher.update(b"s");
                    hasher.update(s.as_bytes());
                }
            }
            hasher.update(&[0xff]);
        }
        hasher.digest()
    }
}

impl<K: Into<String>, V: Into<LabelValue>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        LabelSet::new().extend(iter)
    }
}
