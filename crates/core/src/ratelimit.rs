//! Per-event tap cooldown
//!
//! The limiter runs on the acting device only. It exists to swallow
//! accidental double-taps on one screen, not to arbitrate between
//! devices: two phones tapping the same event inside the window both
//! score, and the backend happily records both. A room-wide debounce
//! would need a server-side gate the backend does not provide.

use std::collections::HashMap;

use crate::models::EventKey;

/// Cooldown window applied per event key
pub const COOLDOWN_MS: i64 = 5_000;

/// Tracks the last fire time per event key on this device
#[derive(Debug)]
pub struct RateLimiter {
    cooldown_ms: i64,
    last_fire: HashMap<EventKey, i64>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_cooldown(COOLDOWN_MS)
    }

    pub fn with_cooldown(cooldown_ms: i64) -> Self {
        Self {
            cooldown_ms,
            last_fire: HashMap::new(),
        }
    }

    /// Attempt to fire an event. Returns `true` and records the fire
    /// time if the key has no prior record or the cooldown has elapsed.
    pub fn try_fire(&mut self, key: &EventKey, now_ms: i64) -> bool {
        match self.last_fire.get(key) {
            Some(last) if now_ms - last < self.cooldown_ms => false,
            _ => {
                self.last_fire.insert(key.clone(), now_ms);
                true
            }
        }
    }

    /// Milliseconds until the key may fire again, if it is cooling
    pub fn retry_in(&self, key: &EventKey, now_ms: i64) -> Option<i64> {
        let last = self.last_fire.get(key)?;
        let remaining = self.cooldown_ms - (now_ms - last);
        (remaining > 0).then_some(remaining)
    }

    /// Forget all cooldowns, e.g. when a new list is loaded
    pub fn reset(&mut self) {
        self.last_fire.clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(index: u32) -> EventKey {
        EventKey::new("list", index)
    }

    #[test]
    fn test_first_fire_succeeds() {
        let mut limiter = RateLimiter::new();
        assert!(limiter.try_fire(&key(0), 1_000));
    }

    #[test]
    fn test_cooldown_boundary() {
        let mut limiter = RateLimiter::new();
        let t = 10_000;
        assert!(limiter.try_fire(&key(0), t));
        assert!(!limiter.try_fire(&key(0), t + COOLDOWN_MS - 1));
        assert!(limiter.try_fire(&key(0), t + COOLDOWN_MS));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut limiter = RateLimiter::new();
        assert!(limiter.try_fire(&key(0), 1_000));
        assert!(limiter.try_fire(&key(1), 1_000));
    }

    #[test]
    fn test_retry_in() {
        let mut limiter = RateLimiter::new();
        assert!(limiter.retry_in(&key(0), 1_000).is_none());
        limiter.try_fire(&key(0), 1_000);
        assert_eq!(limiter.retry_in(&key(0), 2_000), Some(COOLDOWN_MS - 1_000));
        assert!(limiter.retry_in(&key(0), 1_000 + COOLDOWN_MS).is_none());
    }

    #[test]
    fn test_reset_clears_cooldowns() {
        let mut limiter = RateLimiter::new();
        limiter.try_fire(&key(0), 1_000);
        limiter.reset();
        assert!(limiter.try_fire(&key(0), 1_001));
    }
}
