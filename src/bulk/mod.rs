//! # Batched key loading.
//!
//! [`BulkLoader`] collects `(key, callback)` pairs, then loads the keys in
//! fixed-size batches and hands each loaded value to its key's callback.
//!
//! ## Rules
//! - One callback per key; registering a key twice fails with [`BulkLoadError::DuplicateKey`]
//! - Batches follow registration order and run sequentially on the caller's thread
//! - A key missing from its batch result is never dispatched (treat as "not found")
//!
//! ## Example
//! ```rust
//! use guildvisor::BulkLoader;
//!
//! let mut names = Vec::new();
//! let mut loader = BulkLoader::new(2, |ids: &[u64]| {
//!     ids.iter().map(|id| (*id, format!("track-{id}"))).collect()
//! });
//! loader.add(1, |name: String| names.push(name)).unwrap();
//! loader.add(2, |_name: String| {}).unwrap();
//! assert_eq!(loader.perform(), 2);
//! assert_eq!(names, vec!["track-1".to_string()]);
//! ```

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::BulkLoadError;

type Callback<'a, V> = Box<dyn FnOnce(V) + 'a>;

/// Loads registered keys in batches of at most `batch_size`.
pub struct BulkLoader<'a, K, V, F> {
    batch_size: usize,
    fetch: F,
    keys: Vec<K>,
    callbacks: HashMap<K, Callback<'a, V>>,
}

impl<'a, K, V, F> BulkLoader<'a, K, V, F>
where
    K: Eq + Hash + Clone,
    F: FnMut(&[K]) -> Vec<(K, V)>,
{
    /// Creates a loader; `batch_size` is clamped to at least 1.
    ///
    /// `fetch` receives one batch of keys and returns the loaded `(key, value)`
    /// pairs, possibly fewer than requested.
    pub fn new(batch_size: usize, fetch: F) -> Self {
        Self {
            batch_size: batch_size.max(1),
            fetch,
            keys: Vec::new(),
            callbacks: HashMap::new(),
        }
    }

    /// Registers `callback` for `key`.
    pub fn add(&mut self, key: K, callback: impl FnOnce(V) + 'a) -> Result<(), BulkLoadError> {
        if self.callbacks.contains_key(&key) {
            return Err(BulkLoadError::DuplicateKey);
        }
        self.keys.push(key.clone());
        self.callbacks.insert(key, Box::new(callback));
        Ok(())
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Loads every registered key and dispatches the results.
    ///
    /// Returns the number of callbacks invoked.
    pub fn perform(mut self) -> usize {
        let mut dispatched = 0;
        for batch in self.keys.chunks(self.batch_size) {
            let loaded = (self.fetch)(batch);
            tracing::debug!(requested = batch.len(), loaded = loaded.len(), "bulk batch loaded");
            for (key, value) in loaded {
                // Unknown or repeated keys in the response have no callback left.
                if let Some(callback) = self.callbacks.remove(&key) {
                    callback(value);
                    dispatched += 1;
                }
            }
        }
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_batches_in_order_and_skips_missing() {
        let calls = RefCell::new(Vec::new());
        let fired = RefCell::new(Vec::new());

        let mut loader = BulkLoader::new(2, |keys: &[&'static str]| {
            calls.borrow_mut().push(keys.to_vec());
            keys.iter()
                .filter(|k| **k != "k2")
                .map(|k| (*k, ()))
                .collect()
        });
        for key in ["k1", "k2", "k3"] {
            let fired = &fired;
            loader.add(key, move |()| fired.borrow_mut().push(key)).unwrap();
        }
        assert_eq!(loader.len(), 3);
        assert_eq!(loader.perform(), 2);

        assert_eq!(*calls.borrow(), vec![vec!["k1", "k2"], vec!["k3"]]);
        assert_eq!(*fired.borrow(), vec!["k1", "k3"]);
    }

    #[test]
    fn test_callback_receives_loaded_value() {
        let seen = RefCell::new(Vec::new());
        let mut loader = BulkLoader::new(2, |keys: &[u32]| {
            keys.iter().filter(|k| **k != 2).map(|k| (*k, k * 10)).collect()
        });
        for key in [1, 2, 3] {
            let seen = &seen;
            loader
                .add(key, move |v: u32| seen.borrow_mut().push((key, v)))
                .unwrap();
        }
        loader.perform();
        assert_eq!(*seen.borrow(), vec![(1, 10), (3, 30)]);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut loader = BulkLoader::new(10, |_keys: &[u32]| Vec::<(u32, ())>::new());
        loader.add(7, |_| {}).unwrap();
        assert_eq!(loader.add(7, |_| {}), Err(BulkLoadError::DuplicateKey));
        assert_eq!(loader.len(), 1);
    }
}
