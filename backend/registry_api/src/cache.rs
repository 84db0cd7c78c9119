//! Time-boxed response cache for [`crate::client::RegistryClient`].

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Default lifetime of a cached response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    /// key -> (value, inserted at)
    entries: RwLock<HashMap<String, (V, Instant)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A value stored at least `ttl` ago counts as absent and is evicted.
    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.read();
            match entries.get(key) {
                Some((value, at)) if at.elapsed() < self.ttl => return Some(value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // A concurrent `set` may have refreshed the entry since the read.
        let mut entries = self.write();
        let expired = entries.get(key).map(|(_, at)| at.elapsed() >= self.ttl)?;
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|(value, _)| value.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.write().insert(key.into(), (value, Instant::now()));
    }

    pub fn invalidate(&self, key: &str) {
        self.write().remove(key);
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned lock still guards a consistent map; recover it.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, (V, Instant)>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, (V, Instant)>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
