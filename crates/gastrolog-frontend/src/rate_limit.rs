//! Per-IP token buckets with TTL eviction (design §4.2 rate-limit
//! middleware).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

const RATE: f64 = 5.0; // requests per minute
const BURST: f64 = 5.0;
const REFILL_PERIOD_SECS: f64 = 60.0;

struct Bucket {
    tokens: std::sync::Mutex<f64>,
    last_refill: std::sync::Mutex<Instant>,
    last_seen_millis: AtomicU64,
}

impl Bucket {
    fn new(now: Instant) -> Bucket {
        Bucket {
            tokens: std::sync::Mutex::new(BURST),
            last_refill: std::sync::Mutex::new(now),
            last_seen_millis: AtomicU64::new(0),
        }
    }

    fn allow(&self, now: Instant, epoch: Instant) -> bool {
        self.last_seen_millis
            .store(now.duration_since(epoch).as_millis() as u64, Ordering::SeqCst);
        let mut tokens = self.tokens.lock().unwrap();
        let mut last_refill = self.last_refill.lock().unwrap();
        let elapsed = now.saturating_duration_since(*last_refill).as_secs_f64();
        *tokens = (*tokens + elapsed * (RATE / REFILL_PERIOD_SECS)).min(BURST);
        *last_refill = now;
        if *tokens >= 1.0 {
            *tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn idle_for(&self, now: Instant, epoch: Instant) -> Duration {
        let last = self.last_seen_millis.load(Ordering::SeqCst);
        now.duration_since(epoch)
            .saturating_sub(Duration::from_millis(last))
    }
}

/// A table of per-IP token buckets, 5 requests/minute with a burst of 5
/// (design §4.2), plus a background eviction task that drops buckets idle
/// longer than `stale_after`.
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    epoch: Instant,
    stale_after: Duration,
}

impl RateLimiter {
    pub fn new(stale_after: Duration) -> RateLimiter {
        RateLimiter {
            buckets: DashMap::new(),
            epoch: Instant::now(),
            stale_after,
        }
    }

    pub fn with_defaults() -> RateLimiter {
        RateLimiter::new(Duration::from_secs(5 * 60))
    }

    /// Returns whether `ip` may proceed, creating its bucket on first sight.
    /// Two IPs never share bucket state (design §8 "rate limiter
    /// independence") because each gets its own `Bucket` keyed by its own
    /// string.
    pub fn allow(&self, ip: &str) -> bool {
        let now = Instant::now();
        let entry = self
            .buckets
            .entry(ip.to_string())
            .or_insert_with(|| Bucket::new(now));
        entry.allow(now, self.epoch)
    }

    /// Evicts buckets whose last-seen time is older than `stale_after`.
    /// Called by the background cleanup task on `cleanup_interval`.
    pub fn evict_stale(&self) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| bucket.idle_for(now, self.epoch) < self.stale_after);
    }

    #[cfg(test)]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Extracts the client IP from a remote socket address string, stripping
/// the port; falls back to the whole string if it doesn't parse as
/// `host:port` (design §4.2).
pub fn client_ip(remote_addr: &str) -> String {
    match remote_addr.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => {
            // IPv6 addresses look like `[::1]:8080`; strip the brackets too.
            host.trim_start_matches('[').trim_end_matches(']').to_string()
        }
        _ => remote_addr.to_string(),
    }
}

/// Spawns the background eviction loop. Runs every `cleanup_interval` and
/// must terminate when `shutdown` fires, signaling completion through
/// `done` (design §4.2: "must terminate when its context is cancelled and
/// signal completion via a wait group").
pub fn spawn_cleanup_task(
    limiter: std::sync::Arc<RateLimiter>,
    cleanup_interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    gastrolog_ore::task::spawn_named(|| "rate-limit-cleanup", async move {
        let mut ticker = tokio::time::interval(cleanup_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    limiter.evict_stale();
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_burst_then_denies() {
        let limiter = RateLimiter::with_defaults();
        for _ in 0..5 {
            assert!(limiter.allow("10.0.0.1"));
        }
        assert!(!limiter.allow("10.0.0.1"));
    }

    #[test]
    fn independent_ips_have_independent_buckets() {
        let limiter = RateLimiter::with_defaults();
        for _ in 0..5 {
            assert!(limiter.allow("10.0.0.1"));
        }
        assert!(!limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.2"));
    }

    #[test]
    fn client_ip_strips_port() {
        assert_eq!(client_ip("10.0.0.1:54321"), "10.0.0.1");
        assert_eq!(client_ip("[::1]:8080"), "::1");
        assert_eq!(client_ip("not-an-addr"), "not-an-addr");
    }
}
