use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::store::{StateKey, StatePort, StoreError};

/// In-process store with an optional per-value quota.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<BTreeMap<StateKey, String>>,
    max_value_bytes: Option<usize>,
    puts: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(max_value_bytes: usize) -> Self {
        Self {
            max_value_bytes: Some(max_value_bytes),
            ..Self::default()
        }
    }

    /// Successful writes so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl StatePort for MemoryStateStore {
    fn get(&self, key: StateKey) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(&key).cloned())
    }

    fn put(&self, key: StateKey, value: &str) -> Result<(), StoreError> {
        if let Some(limit) = self.max_value_bytes {
            if value.len() > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.as_str(),
                    bytes: value.len(),
                    limit,
                });
            }
        }
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key, value.to_string());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: StateKey) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.remove(&key);
        Ok(())
    }
}
