//! Load-balanced provider selection (spec §4.6, §9 "Load-balancer EWMA
//! under concurrency"). Grounded on the Go source's
//! `loadbalancer.LoadBalancer` (`UpdateProvider`/`SelectProvider`/
//! `GetHealthyProviders`/`Cleanup`), reimplemented over a
//! `dashmap::DashMap<PeerId, ProviderStats>` in place of the Go
//! `[]Provider` behind one `sync.RWMutex` — per-entry updates don't need
//! to serialize against each other, only against reads of the same entry,
//! which is exactly what `dashmap`'s sharded locking gives for free.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use quiver_core::overlay::PeerId;

const HEALTHY_WINDOW: Duration = Duration::from_secs(5 * 60);
const STALE_WINDOW: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct ProviderStats {
    pub ewma_response_time_ms: f64,
    pub success_rate: f64,
    pub load_score: f64,
    pub last_seen: Instant,
}

impl Default for ProviderStats {
    fn default() -> Self {
        ProviderStats {
            ewma_response_time_ms: 0.0,
            success_rate: 1.0,
            load_score: 0.0,
            last_seen: Instant::now(),
        }
    }
}

pub struct LoadBalancer {
    providers: DashMap<PeerId, ProviderStats>,
    round_robin_counter: AtomicU64,
}

impl LoadBalancer {
    pub fn new() -> Self {
        LoadBalancer {
            providers: DashMap::new(),
            round_robin_counter: AtomicU64::new(0),
        }
    }

    /// EWMA update on each completion (spec §4.6 "EWMA update").
    pub fn record(&self, peer: &PeerId, response_time_ms: f64, success: bool) {
        let mut stats = self.providers.entry(peer.clone()).or_default();
        stats.ewma_response_time_ms = 0.8 * stats.ewma_response_time_ms + 0.2 * response_time_ms;
        stats.success_rate = if success {
            0.95 * stats.success_rate + 0.05
        } else {
            0.95 * stats.success_rate
        };
        stats.load_score = stats.ewma_response_time_ms / (stats.success_rate + 0.01);
        stats.last_seen = Instant::now();
    }

    /// Pick one candidate from `discovered` (spec §4.6 "Selection rule"):
    /// the minimum `load_score` among tracked, recently-seen candidates, or
    /// round-robin over the full discovered list when none are tracked.
    pub fn select(&self, discovered: &[PeerId]) -> Option<PeerId> {
        if discovered.is_empty() {
            return None;
        }

        let mut best: Option<(PeerId, f64)> = None;
        for peer in discovered {
            if let Some(stats) = self.providers.get(peer) {
                if stats.last_seen.elapsed() < HEALTHY_WINDOW {
                    if best.as_ref().map(|(_, score)| stats.load_score < *score).unwrap_or(true) {
                        best = Some((peer.clone(), stats.load_score));
                    }
                }
            }
        }

        if let Some((peer, _)) = best {
            return Some(peer);
        }

        let idx = self.round_robin_counter.fetch_add(1, Ordering::Relaxed) as usize % discovered.len();
        Some(discovered[idx].clone())
    }

    /// Entries with `last_seen` within 5 min and `success_rate > 0.5`
    /// (spec §4.6 "Healthy set").
    pub fn healthy(&self) -> Vec<(PeerId, ProviderStats)> {
        self.providers
            .iter()
            .filter(|entry| entry.last_seen.elapsed() < HEALTHY_WINDOW && entry.success_rate > 0.5)
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Drop providers not seen in 10 minutes (spec's Go source `Cleanup`).
    pub fn evict_stale(&self) {
        self.providers.retain(|_, stats| stats.last_seen.elapsed() < STALE_WINDOW);
    }
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_lower_load_score() {
        let lb = LoadBalancer::new();
        let fast = PeerId("fast".to_string());
        let slow = PeerId("slow".to_string());
        lb.record(&fast, 10.0, true);
        lb.record(&slow, 500.0, true);

        let chosen = lb.select(&[fast.clone(), slow.clone()]).unwrap();
        assert_eq!(chosen, fast);
    }

    #[test]
    fn round_robins_without_tracked_metrics() {
        let lb = LoadBalancer::new();
        let a = PeerId("a".to_string());
        let b = PeerId("b".to_string());
        let first = lb.select(&[a.clone(), b.clone()]).unwrap();
        let second = lb.select(&[a.clone(), b.clone()]).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn empty_candidates_yield_none() {
        let lb = LoadBalancer::new();
        assert!(lb.select(&[]).is_none());
    }

    #[test]
    fn healthy_excludes_low_success_rate() {
        let lb = LoadBalancer::new();
        let flaky = PeerId("flaky".to_string());
        lb.record(&flaky, 10.0, true);
        for _ in 0..50 {
            lb.record(&flaky, 10.0, false);
        }
        assert!(lb.healthy().is_empty());
    }
}
