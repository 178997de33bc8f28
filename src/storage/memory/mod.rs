use bytes::Bytes;
use std::collections::HashMap;
use std::time::Instant;

use crate::storage::Unit;

mod storage;

/// Single-threaded key space. Owned by the event loop, so no locking.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    storage: HashMap<Bytes, Unit>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            storage: HashMap::new(),
        }
    }

    /// Physical entry count, including expired entries not yet reclaimed.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn clear(&mut self) {
        self.storage.clear();
    }

    // Returns the live unit for `key`, dropping it first if its deadline passed.
    fn live_unit(&mut self, key: &[u8], now: Instant) -> Option<&mut Unit> {
        let expired = self.storage.get(key)?.is_expired(now);
        if expired {
            log::debug!("Key '{}' has expired", String::from_utf8_lossy(key));
            self.storage.remove(key);
            return None;
        }
        self.storage.get_mut(key)
    }
}
