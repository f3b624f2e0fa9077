//! Rate-limit quota tracking.
//!
//! Pingdom reports two request quotas on every response, a short and a long
//! window, via the `req-limit-short` / `req-limit-long` headers. The values
//! look like `"Remaining: 394 Time until reset: 3589"`.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

/// Response header carrying the short-window quota.
pub const SHORT_LIMIT_HEADER: &str = "req-limit-short";
/// Response header carrying the long-window quota.
pub const LONG_LIMIT_HEADER: &str = "req-limit-long";

static LIMIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Remaining: (\d+) Time until reset: (\d+)").expect("limit header pattern")
});

/// One rate-limit window: requests remaining and when the quota resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub remaining: u64,
    pub resets_at: DateTime<Utc>,
}

/// Latest observed short/long quotas. Empty until the first request
/// completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimits {
    pub short: Option<RateLimit>,
    pub long: Option<RateLimit>,
}

/// Parse a quota header value. A missing or non-matching header yields
/// `None`, never an error.
pub fn parse_limit(header: Option<&str>) -> Option<RateLimit> {
    let caps = LIMIT_PATTERN.captures(header?)?;
    let remaining = caps[1].parse().ok()?;
    let reset_secs: i64 = caps[2].parse().ok()?;
    Some(RateLimit {
        remaining,
        resets_at: Utc::now() + Duration::seconds(reset_secs),
    })
}

/// Holds the snapshot of the most recently observed quotas.
///
/// Every update replaces the snapshot wholesale; a header that fails to
/// parse nullifies that window rather than keeping a stale value. With
/// concurrent requests the last response to complete wins.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    snapshot: Mutex<RateLimits>,
}

impl RateLimitTracker {
    /// Recompute both windows from the given header values and store the
    /// result as the current snapshot.
    pub fn update(&self, short: Option<&str>, long: Option<&str>) -> RateLimits {
        let limits = RateLimits {
            short: parse_limit(short),
            long: parse_limit(long),
        };
        *self.lock() = limits;
        limits
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> RateLimits {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, RateLimits> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
