//! Rate limiting for the login endpoint.
//!
//! Uses a token bucket algorithm with per-IP tracking to prevent brute force attacks.

use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Default sustained login attempts per second per IP.
pub const LOGIN_PER_SEC: u32 = 1;

/// Default burst of login attempts per IP.
pub const LOGIN_BURST: u32 = 5;

/// Bucket key for requests whose client IP cannot be determined.
const UNKNOWN_CLIENT: &str = "unknown";

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login attempts
    pub login: Arc<IpLimiter>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(LOGIN_PER_SEC, LOGIN_BURST)
    }
}

impl RateLimitConfig {
    /// Create a login limiter replenishing `per_second` attempts with a burst of `burst`.
    /// Zero values are raised to one.
    pub fn new(per_second: u32, burst: u32) -> Self {
        let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);

        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(per_second).allow_burst(burst),
            )),
        }
    }

    /// Whether a login attempt from `ip` is allowed right now.
    pub fn check_login(&self, ip: Option<&str>) -> bool {
        let key = ip.unwrap_or(UNKNOWN_CLIENT).to_string();
        self.login.check_key(&key).is_ok()
    }

    /// Forget clients whose buckets have fully refilled.
    pub fn retain_recent(&self) {
        self.login.retain_recent();
        self.login.shrink_to_fit();
    }
}
