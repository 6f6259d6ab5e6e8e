//! Token-bucket limiter gating accepted inference work (spec §4.3 step 2,
//! §8 property 8: `burst = 2 * rate`, internally thread-safe). Built on
//! `governor`, the crate the wider pack reaches for whenever it needs a
//! GCRA/token-bucket limiter (dmrl789-IPPAN, happybigmtn-nullspace,
//! otterevm-node, tempo-greptile-tempo) rather than a hand-rolled one.

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::timeout;

type Limiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct ProviderLimiter {
    limiter: Limiter,
}

impl ProviderLimiter {
    pub fn new(tokens_per_second: u32) -> Self {
        let rate = NonZeroU32::new(tokens_per_second).unwrap_or(nonzero!(1u32));
        let burst = NonZeroU32::new(rate.get().saturating_mul(2)).unwrap_or(nonzero!(2u32));
        let quota = Quota::per_second(rate).allow_burst(burst);
        ProviderLimiter {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Acquire one slot, waiting up to `deadline` for capacity. Returns
    /// `false` if the deadline elapses first (spec §4.3: "if the caller's
    /// deadline elapses first, reply `rate_limited`").
    pub async fn acquire(&self, deadline: Duration) -> bool {
        if self.limiter.check().is_ok() {
            return true;
        }
        timeout(deadline, self.limiter.until_ready())
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_then_denial_then_recovery() {
        let limiter = ProviderLimiter::new(1);

        assert!(limiter.acquire(Duration::from_millis(0)).await);
        assert!(limiter.acquire(Duration::from_millis(0)).await);
        assert!(!limiter.acquire(Duration::from_millis(0)).await);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.acquire(Duration::from_millis(0)).await);
    }
}
