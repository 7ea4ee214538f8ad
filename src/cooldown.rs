use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome of the specific-quote cooldown check. `minutes_left` is the
/// remaining window rounded up to the next whole minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecificDecision {
    Allowed,
    Limited { minutes_left: i64 },
}

/// In-memory, per-process throttle for quote-serving actions. Two tiers: a
/// short per-(user, command) window and a longer per-(user, quote) window.
/// State is volatile and resets on restart. Check-and-stamp happens under a
/// single lock per map, so two rapid calls cannot both pass.
pub struct RateLimiter {
    command_window_secs: i64,
    specific_window_secs: i64,
    command_last_used: Mutex<HashMap<(String, String), i64>>,
    specific_last_used: Mutex<HashMap<(String, String), i64>>,
}

impl RateLimiter {
    pub fn new(command_window_secs: u64, specific_window_mins: u64) -> Self {
        Self {
            command_window_secs: command_window_secs as i64,
            specific_window_secs: (specific_window_mins * 60) as i64,
            command_last_used: Mutex::new(HashMap::new()),
            specific_last_used: Mutex::new(HashMap::new()),
        }
    }

    /// General cooldown for a chat command. Accepting stamps the time;
    /// rejecting leaves the original stamp in place.
    pub fn allow_command(&self, user_id: &str, command: &str) -> bool {
        self.allow_command_at(user_id, command, now_ts())
    }

    pub fn allow_command_at(&self, user_id: &str, command: &str, now: i64) -> bool {
        let mut map = self
            .command_last_used
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = (user_id.to_string(), command.to_string());
        if let Some(last) = map.get(&key) {
            if now - last < self.command_window_secs {
                return false;
            }
        }
        map.insert(key, now);
        true
    }

    /// Specific-quote cooldown, keyed by (user, personality#ordinal). On
    /// rejection reports the minutes left before the quote can be requested
    /// again.
    pub fn allow_specific(&self, user_id: &str, personality_key: &str, number: i32) -> SpecificDecision {
        self.allow_specific_at(user_id, personality_key, number, now_ts())
    }

    pub fn allow_specific_at(
        &self,
        user_id: &str,
        personality_key: &str,
        number: i32,
        now: i64,
    ) -> SpecificDecision {
        let mut map = self
            .specific_last_used
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = (user_id.to_string(), format!("{personality_key}#{number}"));
        if let Some(last) = map.get(&key) {
            let elapsed = now - last;
            if elapsed < self.specific_window_secs {
                let remaining = self.specific_window_secs - elapsed;
                return SpecificDecision::Limited {
                    minutes_left: remaining / 60 + 1,
                };
            }
        }
        map.insert(key, now);
        SpecificDecision::Allowed
    }
}

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_cooldown_rejects_within_window_and_accepts_after() {
        let limiter = RateLimiter::new(6, 15);
        assert!(limiter.allow_command_at("u1", "random", 100));
        assert!(!limiter.allow_command_at("u1", "random", 103));
        assert!(limiter.allow_command_at("u1", "random", 106));
    }

    #[test]
    fn command_cooldown_is_scoped_per_user_and_command() {
        let limiter = RateLimiter::new(6, 15);
        assert!(limiter.allow_command_at("u1", "random", 100));
        assert!(limiter.allow_command_at("u2", "random", 100));
        assert!(limiter.allow_command_at("u1", "top", 100));
        assert!(!limiter.allow_command_at("u1", "random", 101));
    }

    #[test]
    fn rejection_does_not_restamp_the_window() {
        let limiter = RateLimiter::new(6, 15);
        assert!(limiter.allow_command_at("u1", "random", 100));
        assert!(!limiter.allow_command_at("u1", "random", 105));
        // Window is measured from the accepted call at t=100, not t=105.
        assert!(limiter.allow_command_at("u1", "random", 106));
    }

    #[test]
    fn specific_cooldown_reports_minutes_left() {
        let limiter = RateLimiter::new(6, 15);
        assert_eq!(
            limiter.allow_specific_at("u1", "wgg", 7, 1_000),
            SpecificDecision::Allowed
        );
        // 10 minutes in: 5 minutes of window remain, reported as 6.
        assert_eq!(
            limiter.allow_specific_at("u1", "wgg", 7, 1_600),
            SpecificDecision::Limited { minutes_left: 6 }
        );
        assert_eq!(
            limiter.allow_specific_at("u1", "wgg", 7, 1_000 + 15 * 60),
            SpecificDecision::Allowed
        );
    }

    #[test]
    fn specific_cooldown_distinguishes_quotes() {
        let limiter = RateLimiter::new(6, 15);
        assert_eq!(
            limiter.allow_specific_at("u1", "wgg", 7, 1_000),
            SpecificDecision::Allowed
        );
        assert_eq!(
            limiter.allow_specific_at("u1", "wgg", 8, 1_000),
            SpecificDecision::Allowed
        );
        assert_eq!(
            limiter.allow_specific_at("u1", "zultan", 7, 1_000),
            SpecificDecision::Allowed
        );
    }
}
