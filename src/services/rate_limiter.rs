// src/services/rate_limiter.rs
//! Fixed-window rate limiter keyed by actor identity.
//!
//! State-changing operations consult this limiter before touching the
//! registry. Each actor gets a quota of `Q` requests per window of duration
//! `W`; windows are fixed, not sliding, so a burst straddling a window
//! boundary can momentarily admit close to 2×Q requests. That trade-off is
//! intentional and kept.
//!
//! The limiter is an owned, lock-guarded map rather than an ambient
//! singleton, so tests construct isolated instances and shutdown is just
//! dropping it. Lookups for different actors share only a brief read lock;
//! increments for the same actor serialize on a per-actor mutex, so two
//! simultaneous requests at quota-1 can never both be admitted.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default per-window request quota.
pub const DEFAULT_QUOTA: u32 = 30;

/// Default window duration.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Outcome of a rate-limit check, surfaced to callers as retry-after
/// guidance when `allowed` is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Per-actor counter state. Transient: purged once `reset_at` passes.
struct ActorWindow {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Fixed-window counter map keyed by actor identity.
pub struct RateLimiter {
    quota: u32,
    window: ChronoDuration,
    windows: RwLock<HashMap<String, Arc<Mutex<ActorWindow>>>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `quota` requests per `window` per actor.
    pub fn new(quota: u32, window: Duration) -> Self {
        RateLimiter {
            quota,
            window: ChronoDuration::from_std(window)
                .expect("rate limit window out of range"),
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Checks and counts a request for `actor` against the current window.
    ///
    /// Opens a fresh window on the first request from a never-seen or
    /// expired actor. Once the count exceeds the quota, requests are denied
    /// without further increments and `reset_at` reports the unchanged
    /// window end.
    pub fn check(&self, actor: &str) -> RateDecision {
        self.check_at(actor, Utc::now())
    }

    /// Clock-injected variant of [`check`](Self::check); the seam tests use.
    fn check_at(&self, actor: &str, now: DateTime<Utc>) -> RateDecision {
        let entry = self.entry_for(actor);
        let mut window = entry.lock().expect("rate limiter window mutex poisoned");

        if now >= window.reset_at {
            window.count = 1;
            window.reset_at = now + self.window;
            return RateDecision {
                allowed: true,
                limit: self.quota,
                remaining: self.quota - 1,
                reset_at: window.reset_at,
            };
        }

        if window.count < self.quota {
            window.count += 1;
            return RateDecision {
                allowed: true,
                limit: self.quota,
                remaining: self.quota - window.count,
                reset_at: window.reset_at,
            };
        }

        RateDecision {
            allowed: false,
            limit: self.quota,
            remaining: 0,
            reset_at: window.reset_at,
        }
    }

    /// Fetches the per-actor window, inserting an expired placeholder for
    /// never-seen actors so `check_at` opens a fresh window for them.
    fn entry_for(&self, actor: &str) -> Arc<Mutex<ActorWindow>> {
        {
            let map = self.windows.read().expect("rate limiter map lock poisoned");
            if let Some(entry) = map.get(actor) {
                return entry.clone();
            }
        }

        let mut map = self.windows.write().expect("rate limiter map lock poisoned");
        map.entry(actor.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(ActorWindow {
                    count: 0,
                    reset_at: DateTime::<Utc>::MIN_UTC,
                }))
            })
            .clone()
    }

    /// Drops windows whose reset time has passed. Runs on its own cadence,
    /// independent of `check` calls, and never blocks them beyond the brief
    /// map write lock.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut map = self.windows.write().expect("rate limiter map lock poisoned");
        let before = map.len();
        map.retain(|_, entry| {
            entry
                .lock()
                .expect("rate limiter window mutex poisoned")
                .reset_at
                > now
        });
        before - map.len()
    }
}

/// Spawns the background purge loop. The returned handle is dropped (or
/// aborted) on shutdown along with the limiter itself.
pub fn spawn_purge_task(limiter: Arc<RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // first tick fires immediately; skip it
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = limiter.purge_expired(Utc::now());
            if purged > 0 {
                debug!("purged {} expired rate-limit windows", purged);
            }
        }
    })
}
