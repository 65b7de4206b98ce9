use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{RelayError, RelayResult};
use crate::signature::SIGNATURE_WINDOW_MS;

/// Remembers accepted `(serverId, signature)` pairs so a captured envelope
/// cannot be replayed while its timestamp is still fresh.
///
/// An envelope stamped up to one window in the future stays acceptable for
/// two windows, so entries are retained that long.
#[derive(Debug)]
pub struct ReplayGuard {
    retention: Duration,
    seen: Mutex<HashMap<(String, String), Instant>>,
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(Duration::from_millis(2 * SIGNATURE_WINDOW_MS))
    }
}

impl ReplayGuard {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, server_id: &str, signature: &str) -> RelayResult<()> {
        self.check_at(server_id, signature, Instant::now())
    }

    pub fn check_at(&self, server_id: &str, signature: &str, now: Instant) -> RelayResult<()> {
        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let retention = self.retention;
        seen.retain(|_, first_seen| now.saturating_duration_since(*first_seen) <= retention);

        let key = (server_id.to_string(), signature.to_string());
        if seen.contains_key(&key) {
            return Err(RelayError::auth("replayed request"));
        }
        seen.insert(key, now);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_use_of_a_signature_is_rejected() {
        let guard = ReplayGuard::default();
        assert!(guard.check("nodeB", "abc").is_ok());
        assert_eq!(
            guard.check("nodeB", "abc"),
            Err(RelayError::Auth("replayed request".into()))
        );
    }

    #[test]
    fn keys_are_scoped_by_server_id() {
        let guard = ReplayGuard::default();
        assert!(guard.check("nodeB", "abc").is_ok());
        assert!(guard.check("nodeC", "abc").is_ok());
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn entries_expire_after_retention() {
        let guard = ReplayGuard::new(Duration::from_secs(10));
        let start = Instant::now();
        assert!(guard.check_at("nodeB", "abc", start).is_ok());
        assert!(guard
            .check_at("nodeB", "abc", start + Duration::from_secs(5))
            .is_err());
        assert!(guard
            .check_at("nodeB", "abc", start + Duration::from_secs(11))
            .is_ok());
        assert_eq!(guard.len(), 1);
    }
}
