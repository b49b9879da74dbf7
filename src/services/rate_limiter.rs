//! Fixed-window admission control keyed by caller identity

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{config::RateLimitConfig, error::AppResult};

/// Entries kept before expired windows are swept from memory
const MEMORY_SWEEP_THRESHOLD: usize = 10_000;

/// Minimum time between two sweeps
const MEMORY_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Rate-limited actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateAction {
    /// Creating a submission or test run; every attempt counts
    Submission,
    /// Authenticating; only failed attempts count
    AuthFailure,
}

impl RateAction {
    fn key_prefix(&self) -> &'static str {
        match self {
            RateAction::Submission => "rl:submit",
            RateAction::AuthFailure => "rl:auth-fail",
        }
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Time until the current window closes
    pub reset_after: Duration,
}

/// Hits recorded in the current window of one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u64,
    pub reset_after: Duration,
}

/// Counter storage for fixed windows
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record one hit for `key` and return the window's new count
    async fn hit(&self, key: &str, window: Duration) -> AppResult<WindowCount>;

    /// Read the window's count without recording a hit
    async fn peek(&self, key: &str, window: Duration) -> AppResult<WindowCount>;
}

struct Window {
    count: u64,
    started: Instant,
    /// Length of this key's own window
    length: Duration,
}

impl Window {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.started) >= self.length
    }
}

struct MemoryWindows {
    entries: HashMap<String, Window>,
    last_sweep: Instant,
}

impl Default for MemoryWindows {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            last_sweep: Instant::now(),
        }
    }
}

impl MemoryWindows {
    /// Drop expired windows once the map is large, at most once per interval
    fn sweep_if_due(&mut self, now: Instant) {
        if self.entries.len() < MEMORY_SWEEP_THRESHOLD
            || now.duration_since(self.last_sweep) < MEMORY_SWEEP_INTERVAL
        {
            return;
        }
        self.entries.retain(|_, w| !w.expired(now));
        self.last_sweep = now;
    }
}

/// Per-process counters
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<MemoryWindows>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(&self, key: &str, window: Duration) -> AppResult<WindowCount> {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.sweep_if_due(now);

        let entry = windows.entries.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
            length: window,
        });
        if entry.expired(now) || entry.length != window {
            entry.count = 0;
            entry.started = now;
            entry.length = window;
        }
        entry.count += 1;

        Ok(WindowCount {
            count: entry.count,
            reset_after: window.saturating_sub(now.duration_since(entry.started)),
        })
    }

    async fn peek(&self, key: &str, window: Duration) -> AppResult<WindowCount> {
        let now = Instant::now();
        let windows = self.windows.lock().await;

        Ok(match windows.entries.get(key) {
            Some(w) if now.duration_since(w.started) < window => WindowCount {
                count: w.count,
                reset_after: window - now.duration_since(w.started),
            },
            _ => WindowCount {
                count: 0,
                reset_after: window,
            },
        })
    }
}

/// Counters shared by every instance, using Redis INCR + EXPIRE
pub struct RedisRateLimitStore {
    conn: ConnectionManager,
}

impl RedisRateLimitStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn hit(&self, key: &str, window: Duration) -> AppResult<WindowCount> {
        let mut conn = self.conn.clone();

        let count: u64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        let mut ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;

        // First hit of the window, or an earlier EXPIRE never landed
        if ttl < 0 {
            redis::cmd("EXPIRE")
                .arg(key)
                .arg(window.as_secs() as i64)
                .query_async::<()>(&mut conn)
                .await?;
            ttl = window.as_secs() as i64;
        }

        Ok(WindowCount {
            count,
            reset_after: Duration::from_secs(ttl as u64),
        })
    }

    async fn peek(&self, key: &str, window: Duration) -> AppResult<WindowCount> {
        let mut conn = self.conn.clone();

        let count: Option<u64> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;

        Ok(WindowCount {
            count: count.unwrap_or(0),
            reset_after: if ttl > 0 {
                Duration::from_secs(ttl as u64)
            } else {
                window
            },
        })
    }
}

/// Applies the named policies on top of a counter store
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    fn policy(&self, action: RateAction) -> (u64, Duration) {
        match action {
            RateAction::Submission => (self.config.submission_limit, self.config.submission_window),
            RateAction::AuthFailure => (
                self.config.auth_failure_limit,
                self.config.auth_failure_window,
            ),
        }
    }

    fn key(action: RateAction, identity: &str) -> String {
        format!("{}:{}", action.key_prefix(), identity)
    }

    /// Check whether `identity` may perform `action` now.
    ///
    /// Submission checks count as a hit. Auth-failure checks only read the
    /// counter; failures are recorded with [`RateLimiter::record_failure`].
    pub async fn allow(&self, identity: &str, action: RateAction) -> AppResult<RateDecision> {
        let (limit, window) = self.policy(action);
        let key = Self::key(action, identity);

        let (counted, allowed) = match action {
            RateAction::Submission => {
                let counted = self.store.hit(&key, window).await?;
                (counted, counted.count <= limit)
            }
            RateAction::AuthFailure => {
                let counted = self.store.peek(&key, window).await?;
                (counted, counted.count < limit)
            }
        };

        Ok(RateDecision {
            allowed,
            limit,
            remaining: limit.saturating_sub(counted.count),
            reset_after: counted.reset_after,
        })
    }

    /// Count a failed authentication attempt for `identity`
    pub async fn record_failure(&self, identity: &str) -> AppResult<RateDecision> {
        let (limit, window) = self.policy(RateAction::AuthFailure);
        let counted = self
            .store
            .hit(&Self::key(RateAction::AuthFailure, identity), window)
            .await?;

        Ok(RateDecision {
            allowed: counted.count < limit,
            limit,
            remaining: limit.saturating_sub(counted.count),
            reset_after: counted.reset_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitBackend;

    fn limiter() -> RateLimiter {
        RateLimiter::new(
            Arc::new(MemoryRateLimitStore::new()),
            RateLimitConfig {
                backend: RateLimitBackend::Memory,
                submission_limit: 5,
                submission_window: Duration::from_secs(60),
                auth_failure_limit: 3,
                auth_failure_window: Duration::from_secs(900),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_submission_waits_for_next_window() {
        let limiter = limiter();

        for expected_remaining in (0..5).rev() {
            let decision = limiter.allow("user-1", RateAction::Submission).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let sixth = limiter.allow("user-1", RateAction::Submission).await.unwrap();
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);
        assert!(sixth.reset_after <= Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(61)).await;

        let retry = limiter.allow("user-1", RateAction::Submission).await.unwrap();
        assert!(retry.allowed);
        assert_eq!(retry.remaining, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identities_are_independent() {
        let limiter = limiter();

        for _ in 0..5 {
            limiter.allow("user-1", RateAction::Submission).await.unwrap();
        }

        let other = limiter.allow("user-2", RateAction::Submission).await.unwrap();
        assert!(other.allowed);
        assert_eq!(other.remaining, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_failed_auth_attempts_count() {
        let limiter = limiter();

        for _ in 0..10 {
            let check = limiter.allow("user-1", RateAction::AuthFailure).await.unwrap();
            assert!(check.allowed);
        }

        for _ in 0..3 {
            limiter.record_failure("user-1").await.unwrap();
        }

        let blocked = limiter.allow("user-1", RateAction::AuthFailure).await.unwrap();
        assert!(!blocked.allowed);

        tokio::time::advance(Duration::from_secs(901)).await;
        let reopened = limiter.allow("user-1", RateAction::AuthFailure).await.unwrap();
        assert!(reopened.allowed);
        assert_eq!(reopened.remaining, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_policies_do_not_share_counters() {
        let limiter = limiter();

        for _ in 0..3 {
            limiter.record_failure("user-1").await.unwrap();
        }

        let submission = limiter.allow("user-1", RateAction::Submission).await.unwrap();
        assert!(submission.allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_lockouts_with_longer_windows() {
        let store = Arc::new(MemoryRateLimitStore::new());
        let limiter = RateLimiter::new(store.clone(), limiter().config);

        for _ in 0..3 {
            limiter.record_failure("victim").await.unwrap();
        }
        for i in 0..MEMORY_SWEEP_THRESHOLD {
            limiter
                .allow(&format!("user-{i}"), RateAction::Submission)
                .await
                .unwrap();
        }

        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.allow("late-user", RateAction::Submission).await.unwrap();

        // Submission windows expired and were swept; the lockout was not
        let windows = store.windows.lock().await;
        assert_eq!(windows.entries.len(), 2);
        drop(windows);

        let after = limiter.allow("victim", RateAction::AuthFailure).await.unwrap();
        assert!(!after.allowed);
        assert_eq!(after.remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_runs_at_most_once_per_interval() {
        let store = MemoryRateLimitStore::new();
        let window = Duration::from_secs(1);

        for i in 0..MEMORY_SWEEP_THRESHOLD {
            store.hit(&format!("k{i}"), window).await.unwrap();
        }

        tokio::time::advance(Duration::from_secs(2)).await;
        store.hit("early", window).await.unwrap();
        assert_eq!(
            store.windows.lock().await.entries.len(),
            MEMORY_SWEEP_THRESHOLD + 1
        );

        tokio::time::advance(MEMORY_SWEEP_INTERVAL).await;
        store.hit("late", window).await.unwrap();
        let windows = store.windows.lock().await;
        assert_eq!(windows.entries.len(), 1);
        assert!(windows.entries.contains_key("late"));
    }

    #[test]
    fn test_memory_peek_on_unknown_key() {
        let store = MemoryRateLimitStore::new();
        let counted = tokio_test::block_on(store.peek("nobody", Duration::from_secs(60))).unwrap();
        assert_eq!(counted.count, 0);
        assert_eq!(counted.reset_after, Duration::from_secs(60));
    }
}
