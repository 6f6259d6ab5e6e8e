//! Periodic background reaping (spec §5 "Gateway token buckets: ... a
//! periodic reaper (every 5 min) removing buckets at full capacity"), plus
//! the load balancer's matching stale-provider eviction from the Go
//! source's `LoadBalancer.Cleanup`. Grounded on the provider's own
//! `tokio::spawn`-a-background-task pattern.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use quiver_gateway::balancer::LoadBalancer;
use quiver_gateway::ratelimit::PerTokenLimiter;

const REAP_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub fn spawn(limiter: Arc<PerTokenLimiter>, balancer: Arc<LoadBalancer>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REAP_INTERVAL);
        loop {
            ticker.tick().await;
            limiter.reap_idle();
            balancer.evict_stale();
            debug!("reaped idle rate-limit buckets and stale providers");
        }
    });
}
