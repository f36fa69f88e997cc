//! Per-service serialization of reconciliation sequences
//!
//! Two replace-or-create sequences for the same (cluster, namespace,
//! service) can both see "nothing to replace" before either creates.
//! Sequences take the key's lock for their whole duration. A key's entry
//! lives only while someone holds or waits for it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::ServiceKey;

type LockTable = HashMap<ServiceKey, Arc<AsyncMutex<()>>>;

#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<LockTable>,
}

/// Exclusive access to one key; released on drop
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: ServiceKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for exclusive access to `key`
    pub async fn acquire(&self, key: &ServiceKey) -> KeyGuard<'_> {
        let lock = Arc::clone(self.table().entry(key.clone()).or_default());
        KeyGuard {
            locks: self,
            key: key.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.table().len()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the table's own reference left: no holder, no waiter
        let mut table = self.locks.table();
        if table
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.key);
        }
    }
}
