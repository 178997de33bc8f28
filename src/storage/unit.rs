use bytes::Bytes;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct Unit {
    pub value: Bytes,
    pub expiry: Option<Instant>,
}

impl Unit {
    pub fn new(value: Bytes) -> Self {
        Unit {
            value,
            expiry: None,
        }
    }

    /// A deadline equal to `now` already counts as expired.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expiry {
            Some(deadline) => deadline <= now,
            None => false,
        }
    }

    /// Remaining lifetime in milliseconds, `None` when the unit never expires.
    pub fn remaining_millis(&self, now: Instant) -> Option<i64> {
        let deadline = self.expiry?;
        let remaining = deadline.saturating_duration_since(now).as_millis();
        Some(i64::try_from(remaining).unwrap_or(i64::MAX))
    }
}
