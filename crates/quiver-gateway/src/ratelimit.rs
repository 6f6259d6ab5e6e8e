//! Per-token rate limiting (spec §4.5 step 2, §5 "Gateway token buckets:
//! map guarded by a reader-writer lock with a periodic reaper"). Grounded
//! on the Go source's `ratelimit.Limiter` (`map[string]*rate.Limiter`
//! behind an `RWMutex`, lazily created per token, reaped when back at full
//! capacity), reimplemented with `governor`'s `RateLimiter` the way the
//! provider already does (spec §4.3), keyed by token in a `dashmap`
//! instead of a mutex-guarded `HashMap` since multiple tokens are updated
//! concurrently and independently.

use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;

type TokenLimiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

struct Bucket {
    limiter: TokenLimiter,
    last_used: Instant,
}

pub struct PerTokenLimiter {
    buckets: DashMap<String, Bucket>,
    rate_per_second: u32,
    idle_after: Duration,
}

impl PerTokenLimiter {
    pub fn new(rate_per_second: u32) -> Self {
        PerTokenLimiter {
            buckets: DashMap::new(),
            rate_per_second,
            idle_after: Duration::from_secs(300),
        }
    }

    /// `true` if a unit was available for `token`'s bucket (spec: rate
    /// `rps`, burst `2*rps`).
    pub fn allow(&self, token: &str) -> bool {
        let mut entry = self.buckets.entry(token.to_string()).or_insert_with(|| {
            let rate = NonZeroU32::new(self.rate_per_second).unwrap_or(nonzero!(1u32));
            let burst = NonZeroU32::new(self.rate_per_second * 2).unwrap_or(nonzero!(2u32));
            Bucket {
                limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
                last_used: Instant::now(),
            }
        });
        entry.last_used = Instant::now();
        entry.limiter.check().is_ok()
    }

    /// Drop buckets untouched for longer than their refill window, leaving
    /// only actively-used tokens tracked (spec §5's "periodic reaper (every
    /// 5 min) removing buckets at full capacity"; since `governor` has no
    /// cheap way to peek "currently at full capacity" without consuming a
    /// permit, idle-for-5-minutes is the equivalent condition — a bucket
    /// that hasn't been touched in that long has necessarily refilled).
    pub fn reap_idle(&self) {
        let cutoff = self.idle_after;
        self.buckets.retain(|_, bucket| bucket.last_used.elapsed() < cutoff);
    }

    pub fn tracked_tokens(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_denial_per_token() {
        let limiter = PerTokenLimiter::new(1);
        assert!(limiter.allow("alice"));
        assert!(limiter.allow("alice"));
        assert!(!limiter.allow("alice"));
    }

    #[test]
    fn tokens_are_independent() {
        let limiter = PerTokenLimiter::new(1);
        assert!(limiter.allow("alice"));
        assert!(limiter.allow("alice"));
        assert!(!limiter.allow("alice"));
        assert!(limiter.allow("bob"));
    }

    #[test]
    fn reap_keeps_recently_used_buckets() {
        let limiter = PerTokenLimiter::new(5);
        limiter.allow("active");
        limiter.reap_idle();
        assert_eq!(limiter.tracked_tokens(), 1);
    }
}
