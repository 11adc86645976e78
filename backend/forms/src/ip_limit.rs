//! # IP Rate Limiter
//!
//! Fixed window counter per requester IP, used at the outer request boundary.
//!
//! - First request from an IP, or first after its window ran out, opens a new
//!   window with a count of 1
//! - Under the max, the count goes up and the request is let through
//! - At the max, the request is refused with the time left in the window
//!
//! A sweeper task drops ran-out windows once per window length so the table
//! stays bounded.
//!
//! ## Scaling
//! The table lives in this process only. Two instances behind a load balancer
//! each hand out the full allowance. Fine for a single instance deployment;
//! anything bigger needs the counters in a shared store.
use std::{collections::HashMap, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval},
};
use tracing::debug;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_REQUESTS: u32 = 60;

pub const LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rate limited, retry after {retry_after_secs}s")]
pub struct Limited {
    pub retry_after_secs: u64,
}

#[derive(Debug)]
struct Window {
    count: u32,
    reset_at: Instant,
}

impl Window {
    fn expired(&self, now: Instant) -> bool {
        self.reset_at < now
    }
}

#[derive(Debug)]
pub struct IpRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    window: Duration,
    max_requests: u32,
}

impl Default for IpRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_REQUESTS)
    }
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
            max_requests,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn check(&self, ip: &str) -> Result<(), Limited> {
        self.check_at(ip, Instant::now()).await
    }

    pub async fn check_at(&self, ip: &str, now: Instant) -> Result<(), Limited> {
        let mut windows = self.windows.lock().await;

        match windows.get_mut(ip) {
            Some(window) if !window.expired(now) => {
                if window.count < self.max_requests {
                    window.count += 1;
                    return Ok(());
                }

                let left = window.reset_at.saturating_duration_since(now);
                Err(Limited {
                    retry_after_secs: left.as_millis().div_ceil(1000).max(1) as u64,
                })
            }
            _ => {
                windows.insert(
                    ip.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                Ok(())
            }
        }
    }

    /// Drops every ran-out window, returning how many went.
    pub async fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().await;
        let before = windows.len();

        windows.retain(|_, window| !window.expired(now));

        before - windows.len()
    }

    pub async fn len(&self) -> usize {
        self.windows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sweeps once per window until the handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = interval(limiter.window);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let removed = limiter.sweep_at(Instant::now()).await;
                if removed > 0 {
                    debug!("Swept {removed} expired rate limit windows");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP: &str = "203.0.113.7";

    #[tokio::test]
    async fn test_max_requests_then_limited() {
        let limiter = IpRateLimiter::default();
        let now = Instant::now();

        for _ in 0..DEFAULT_MAX_REQUESTS {
            assert!(limiter.check_at(IP, now).await.is_ok());
        }

        let limited = limiter.check_at(IP, now).await.unwrap_err();
        assert_eq!(limited.retry_after_secs, 60);
    }

    #[tokio::test]
    async fn test_retry_after_counts_down() {
        let limiter = IpRateLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();

        limiter.check_at(IP, now).await.unwrap();

        let limited = limiter
            .check_at(IP, now + Duration::from_millis(45_500))
            .await
            .unwrap_err();
        assert_eq!(limited.retry_after_secs, 15);

        let at_edge = limiter
            .check_at(IP, now + Duration::from_secs(60))
            .await
            .unwrap_err();
        assert_eq!(at_edge.retry_after_secs, 1);
    }

    #[tokio::test]
    async fn test_window_resets_after_expiry() {
        let limiter = IpRateLimiter::new(Duration::from_secs(60), 2);
        let now = Instant::now();

        limiter.check_at(IP, now).await.unwrap();
        limiter.check_at(IP, now).await.unwrap();
        assert!(limiter.check_at(IP, now).await.is_err());

        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at(IP, later).await.is_ok());
        assert!(limiter.check_at(IP, later).await.is_ok());
        assert!(limiter.check_at(IP, later).await.is_err());
    }

    #[tokio::test]
    async fn test_ips_are_independent() {
        let limiter = IpRateLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();

        limiter.check_at(IP, now).await.unwrap();
        assert!(limiter.check_at(IP, now).await.is_err());
        assert!(limiter.check_at("198.51.100.1", now).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_checks_do_not_undercount() {
        let limiter = Arc::new(IpRateLimiter::new(Duration::from_secs(60), 60));

        let tasks: Vec<_> = (0..100)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.check(IP).await.is_ok() })
            })
            .collect();

        let mut allowed = 0;
        for task in tasks {
            if task.await.unwrap() {
                allowed += 1;
            }
        }

        assert_eq!(allowed, 60);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let limiter = IpRateLimiter::new(Duration::from_secs(60), 5);
        let now = Instant::now();

        limiter.check_at("old", now).await.unwrap();
        limiter
            .check_at("new", now + Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(limiter.sweep_at(now + Duration::from_secs(61)).await, 1);
        assert_eq!(limiter.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_clears_table() {
        let limiter = Arc::new(IpRateLimiter::new(Duration::from_secs(60), 5));
        let sweeper = limiter.spawn_sweeper();

        limiter.check(IP).await.unwrap();
        assert_eq!(limiter.len().await, 1);

        tokio::time::sleep(Duration::from_secs(121)).await;
        assert!(limiter.is_empty().await);

        sweeper.abort();
    }
}
