//! Ordered key-value store backing the keeper
//!
//! Keys are compared bytewise, so iterating a prefix visits every record
//! under it exactly once, in key order.

use std::collections::BTreeMap;

/// In-memory ordered KV store; cloning takes a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key).map(|v| v.as_slice())
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.data.contains_key(key)
    }

    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.data.insert(key, value);
    }

    /// Delete a key; returns whether it existed
    pub fn delete(&mut self, key: &[u8]) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lazily iterate every (key, value) whose key starts with `prefix`
    pub fn prefix_iter(&self, prefix: &[u8]) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        let prefix = prefix.to_vec();
        self.data
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let mut store = KvStore::new();
        store.set(vec![1, 2], vec![9]);

        assert_eq!(store.get(&[1, 2]), Some(&[9u8][..]));
        assert!(store.has(&[1, 2]));
        assert!(store.delete(&[1, 2]));
        assert!(!store.delete(&[1, 2]));
        assert!(store.is_empty());
    }

    #[test]
    fn test_prefix_iter_stays_inside_prefix() {
        let mut store = KvStore::new();
        store.set(vec![0x10, 1], vec![0]);
        store.set(vec![0x11, 2], vec![1]);
        store.set(vec![0x11, 1], vec![2]);
        store.set(vec![0x12, 0], vec![3]);

        let keys: Vec<Vec<u8>> = store.prefix_iter(&[0x11]).map(|(k, _)| k.to_vec()).collect();
        assert_eq!(keys, vec![vec![0x11, 1], vec![0x11, 2]]);

        // Restartable: a second scan sees the same records
        assert_eq!(store.prefix_iter(&[0x11]).count(), 2);
        assert_eq!(store.prefix_iter(&[0x13]).count(), 0);
    }
}
