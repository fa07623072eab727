use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Attempt {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window counter keyed by caller IP, used to gate login attempts.
/// Process-local and reset on restart. Injected into the handlers that need
/// it rather than living as a module-level singleton, so it can be swapped
/// for a shared store later and exercised directly in tests.
pub struct RateLimiter {
    max_attempts: u32,
    window: Duration,
    attempts: Mutex<HashMap<IpAddr, Attempt>>,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Records one attempt from `ip` and reports whether it is allowed.
    /// Expired windows are evicted on access.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut attempts = self.attempts.lock().unwrap();

        attempts.retain(|_, a| a.reset_at > now);

        match attempts.get_mut(&ip) {
            None => {
                attempts.insert(
                    ip,
                    Attempt {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                true
            }
            Some(a) if a.count >= self.max_attempts => false,
            Some(a) => {
                a.count += 1;
                true
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ip() -> IpAddr {
        "203.0.113.7".parse().unwrap()
    }

    #[test]
    fn allows_up_to_the_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check(ip()));
        assert!(limiter.check(ip()));
        assert!(limiter.check(ip()));
        assert!(!limiter.check(ip()));
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at(ip(), start));
        assert!(!limiter.check_at(ip(), start + Duration::from_secs(30)));
        assert!(limiter.check_at(ip(), start + Duration::from_secs(61)));
    }

    #[test]
    fn addresses_are_tracked_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let other: IpAddr = "198.51.100.9".parse().unwrap();
        assert!(limiter.check(ip()));
        assert!(!limiter.check(ip()));
        assert!(limiter.check(other));
    }
}
