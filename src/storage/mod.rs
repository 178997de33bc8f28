pub mod memory;
pub mod unit;

pub use memory::MemoryStorage;
pub use unit::Unit;

use bytes::Bytes;
use std::time::Duration;

/// `ttl` reply for a key that does not exist (or just expired).
pub const TTL_MISSING: i64 = -2;
/// `ttl` reply for a key that exists without a deadline.
pub const TTL_PERSISTENT: i64 = -1;

pub trait Storage {
    fn get(&mut self, key: &[u8]) -> Option<Bytes>;
    fn set(&mut self, key: Bytes, value: Bytes);
    fn delete(&mut self, key: &[u8]) -> bool;
    fn exists(&mut self, key: &[u8]) -> bool;
    fn expire(&mut self, key: &[u8], ttl: Duration) -> bool;
    fn ttl(&mut self, key: &[u8]) -> i64;
    fn sweep_expired(&mut self) -> usize;

    fn delete_multiple(&mut self, keys: &[&[u8]]) -> usize {
        keys.iter().filter(|key| self.delete(key)).count()
    }

    fn exists_multiple(&mut self, keys: &[&[u8]]) -> usize {
        keys.iter().filter(|key| self.exists(key)).count()
    }
}
