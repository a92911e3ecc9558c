use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

/// Fixed-window request counter keyed by client address.
///
/// Each client gets a window that opens on its first request and lasts
/// `window_seconds`; at most `max_requests` requests are accepted inside it.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<IpAddr, Window>>>,
    enabled: bool,
    max_requests: u32,
    window: Duration,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Result of rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed {
        /// Requests left in the current window.
        remaining: u32,
        /// Time until the window resets.
        reset_after: Duration,
    },
    Limited {
        retry_after: Duration,
    },
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            enabled: config.enabled,
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_seconds),
        }
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    /// Count a request from `ip` and decide whether it may proceed.
    pub async fn check_rate_limit(&self, ip: IpAddr) -> RateLimitResult {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> RateLimitResult {
        if !self.enabled {
            return RateLimitResult::Allowed {
                remaining: self.max_requests,
                reset_after: Duration::ZERO,
            };
        }

        let mut clients = self.inner.lock().await;
        let window = clients.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.window {
            debug!(%ip, "Rate limit window reset");
            window.started = now;
            window.count = 0;
        }

        let reset_after = self.window.saturating_sub(now.duration_since(window.started));

        if window.count >= self.max_requests {
            warn!(%ip, limit = self.max_requests, "Rate limit exceeded");
            return RateLimitResult::Limited {
                retry_after: reset_after,
            };
        }

        window.count += 1;
        let remaining = self.max_requests - window.count;
        debug!(%ip, remaining, "Rate limit OK");
        RateLimitResult::Allowed {
            remaining,
            reset_after,
        }
    }

    /// Drop windows that have expired so idle clients do not accumulate.
    pub async fn purge_expired(&self) {
        self.purge_expired_at(Instant::now()).await
    }

    async fn purge_expired_at(&self, now: Instant) {
        let mut clients = self.inner.lock().await;
        clients.retain(|ip, window| {
            let keep = now.duration_since(window.started) < self.window;
            if !keep {
                debug!(%ip, "Cleaned up rate limit entry");
            }
            keep
        });
    }

    /// Runs [`purge_expired`](Self::purge_expired) forever; spawn it.
    pub async fn cleanup_task(self) {
        let interval = self.window.max(Duration::from_secs(60));
        loop {
            sleep(interval).await;
            self.purge_expired().await;
        }
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.inner.lock().await.len()
    }
}
