//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch hands the key a fresh, strictly increasing stamp. The smallest
/// stamp is the least recently used key, so every operation is logarithmic.
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Current stamp of each tracked key
    stamps: HashMap<String, u64>,
    /// Keys ordered by stamp, oldest first
    order: BTreeMap<u64, String>,
    next_stamp: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, tracking it if it is new.
    pub fn touch(&mut self, key: &str) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;

        match self.stamps.get_mut(key) {
            Some(old) => {
                let owned = self.order.remove(&*old).unwrap_or_else(|| key.to_string());
                *old = stamp;
                self.order.insert(stamp, owned);
            }
            None => {
                self.stamps.insert(key.to_string(), stamp);
                self.order.insert(stamp, key.to_string());
            }
        }
    }

    // == Remove ==
    /// Stops tracking a key. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        if let Some(stamp) = self.stamps.remove(key) {
            self.order.remove(&stamp);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    pub fn keys_by_recency(&self) -> impl Iterator<Item = &str> {
        self.order.values().rev().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
        self.order.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.stamps.contains_key(key)
    }
}
