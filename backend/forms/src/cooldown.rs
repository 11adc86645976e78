//! # Cooldown Gate
//!
//! Courtesy throttle held by the client. After a completed submission the
//! client is handed a cookie carrying the submission time in epoch
//! milliseconds; another attempt inside the window is turned away before any
//! validation runs.
//!
//! Clearing the cookie clears the cooldown, so this only guards against
//! accidental double submits. The IP limiter is the defensive layer.
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

pub const CONTACT_COOKIE: &str = "last_contact_submission";
pub const WAITLIST_COOKIE: &str = "last_waitlist_submission";

pub const DEFAULT_WINDOW_SECS: i64 = 60;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cooldown active for another {remaining}")]
pub struct CooldownActive {
    pub remaining: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct Cooldown {
    window: Duration,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_WINDOW_SECS))
    }
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Unreadable stamps count as no stamp.
    pub fn check(&self, stamp: Option<&str>, now: DateTime<Utc>) -> Result<(), CooldownActive> {
        let Some(last) = stamp.and_then(parse_stamp) else {
            return Ok(());
        };

        let elapsed = now - last;
        if elapsed < self.window {
            return Err(CooldownActive {
                remaining: self.window - elapsed,
            });
        }

        Ok(())
    }
}

pub fn parse_stamp(value: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = value.trim().parse().ok()?;
    DateTime::from_timestamp_millis(millis)
}

pub fn format_stamp(at: DateTime<Utc>) -> String {
    at.timestamp_millis().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_no_stamp_passes() {
        assert!(Cooldown::default().check(None, start()).is_ok());
    }

    #[test]
    fn test_inside_window_rejected() {
        let cooldown = Cooldown::default();
        let stamp = format_stamp(start());

        let active = cooldown
            .check(Some(&stamp), start() + Duration::seconds(59))
            .unwrap_err();
        assert_eq!(active.remaining, Duration::seconds(1));
    }

    #[test]
    fn test_window_boundary() {
        let cooldown = Cooldown::default();
        let stamp = format_stamp(start());

        assert!(
            cooldown
                .check(Some(&stamp), start() + Duration::milliseconds(59_999))
                .is_err()
        );
        assert!(cooldown.check(Some(&stamp), start() + Duration::seconds(60)).is_ok());
        assert!(cooldown.check(Some(&stamp), start() + Duration::seconds(61)).is_ok());
    }

    #[test]
    fn test_garbage_stamp_ignored() {
        let cooldown = Cooldown::default();

        assert!(cooldown.check(Some("yesterday"), start()).is_ok());
        assert!(cooldown.check(Some(""), start()).is_ok());
    }

    #[test]
    fn test_stamp_round_trip_keeps_millis() {
        let at = start() + Duration::milliseconds(123);
        assert_eq!(parse_stamp(&format_stamp(at)), Some(at));
    }
}
