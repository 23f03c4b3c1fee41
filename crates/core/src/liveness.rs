//! Device liveness predicate.
//!
//! "Online" is a pure function of the stored `last_seen` timestamp,
//! recomputed on demand and never cached. Liveness is advisory display
//! state only; a silent device is never auto-failed.

use crate::types::Timestamp;

/// A device is online while its last heartbeat is at most this old.
/// Three missed beats at [`HEARTBEAT_INTERVAL_SECS`] put it offline.
pub const ONLINE_WINDOW_SECS: i64 = 90;

/// Heartbeat interval advertised to devices.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Whether a device counts as online at `now`.
///
/// A device with no recorded heartbeat is offline. The boundary is
/// inclusive: exactly [`ONLINE_WINDOW_SECS`] old is still online.
pub fn is_online(last_seen: Option<Timestamp>, now: Timestamp) -> bool {
    match last_seen {
        Some(seen) => now.signed_duration_since(seen).num_seconds() <= ONLINE_WINDOW_SECS,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn never_seen_is_offline() {
        assert!(!is_online(None, Utc::now()));
    }

    #[test]
    fn online_at_exactly_ninety_seconds() {
        let now = Utc::now();
        let seen = now - Duration::seconds(ONLINE_WINDOW_SECS);
        assert!(is_online(Some(seen), now));
    }

    #[test]
    fn offline_past_ninety_seconds() {
        let now = Utc::now();
        let seen = now - Duration::seconds(ONLINE_WINDOW_SECS + 1);
        assert!(!is_online(Some(seen), now));
    }

    #[test]
    fn fresh_heartbeat_is_online() {
        let now = Utc::now();
        assert!(is_online(Some(now - Duration::seconds(5)), now));
    }

    #[test]
    fn grace_window_covers_three_missed_beats() {
        assert_eq!(ONLINE_WINDOW_SECS as u64, HEARTBEAT_INTERVAL_SECS * 3);
    }
}
