//! Severity and id tallies.

use serde::Serialize;
use std::borrow::Borrow;
use std::collections::BTreeMap;

use crate::message::Severity;

/// Non-negative counts keyed by `K`, iterated in key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Counters<K: Ord> {
    counts: BTreeMap<K, u64>,
}

impl<K: Ord> Default for Counters<K> {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }
}

impl<K: Ord> Counters<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `key`, 0 when untracked.
    pub fn get<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Store `count`; negative inputs clamp to 0.
    pub fn set(&mut self, key: K, count: i64) {
        let clamped = u64::try_from(count).unwrap_or(0);
        self.counts.insert(key, clamped);
    }

    /// Add one, tracking the key at 1 if it was absent. Returns the new count.
    pub fn increment(&mut self, key: K) -> u64 {
        let count = self.counts.entry(key).or_insert(0);
        *count += 1;
        *count
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.counts.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.counts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

impl Counters<Severity> {
    /// Every severity of the fixed domain, at 0.
    pub fn zeroed_severities() -> Self {
        let mut counters = Self::new();
        counters.reset_severities();
        counters
    }

    /// Reset every severity of the fixed domain to 0.
    pub fn reset_severities(&mut self) {
        for severity in Severity::ALL {
            self.counts.insert(severity, 0);
        }
    }
}
