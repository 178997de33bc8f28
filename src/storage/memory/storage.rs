use bytes::Bytes;
use std::time::{Duration, Instant};

use super::MemoryStorage;
use crate::storage::{Storage, Unit, TTL_MISSING, TTL_PERSISTENT};

impl Storage for MemoryStorage {
    fn get(&mut self, key: &[u8]) -> Option<Bytes> {
        log::debug!("Getting value for key '{}'", String::from_utf8_lossy(key));
        let now = Instant::now();
        self.live_unit(key, now).map(|unit| unit.value.clone())
    }

    fn set(&mut self, key: Bytes, value: Bytes) {
        log::debug!(
            "Setting key '{}' ({} bytes)",
            String::from_utf8_lossy(&key),
            value.len()
        );
        // A fresh unit carries no deadline, which is what clears a previous TTL.
        self.storage.insert(key, Unit::new(value));
    }

    fn delete(&mut self, key: &[u8]) -> bool {
        log::debug!("Deleting key '{}'", String::from_utf8_lossy(key));
        self.storage.remove(key).is_some()
    }

    fn exists(&mut self, key: &[u8]) -> bool {
        let now = Instant::now();
        self.live_unit(key, now).is_some()
    }

    fn expire(&mut self, key: &[u8], ttl: Duration) -> bool {
        let now = Instant::now();
        let Some(unit) = self.live_unit(key, now) else {
            return false;
        };
        // A deadline past the clock's range is as good as none.
        unit.expiry = now.checked_add(ttl);
        log::debug!(
            "Setting expiry for key '{}' to {}ms",
            String::from_utf8_lossy(key),
            ttl.as_millis()
        );
        true
    }

    fn ttl(&mut self, key: &[u8]) -> i64 {
        let now = Instant::now();
        match self.live_unit(key, now) {
            None => TTL_MISSING,
            Some(unit) => unit.remaining_millis(now).unwrap_or(TTL_PERSISTENT),
        }
    }

    fn sweep_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.storage.len();
        self.storage.retain(|_, unit| !unit.is_expired(now));
        let removed = before - self.storage.len();
        if removed > 0 {
            log::debug!("Swept {} expired keys", removed);
        }
        removed
    }
}
