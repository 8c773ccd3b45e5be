//! In-process pacing gate for scheduled job classes.
//!
//! The scheduler uses one [`CooldownMap`] to keep a job class (billing run,
//! reminder scan) from firing again before its minimum interval elapses,
//! even when a manual trigger lands between ticks. State lives in memory
//! only; restart clears it, and the per-bill and per-customer reminder
//! cooldowns persisted in the store still hold afterwards.

use chrono::{DateTime, TimeDelta, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::trace;

/// Keyed last-run timestamps shared across scheduler tasks.
#[derive(Debug, Clone, Default)]
pub struct CooldownMap {
    inner: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl CooldownMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records now as the key's last run, unless the
    /// previous run was less than `min_interval` ago.
    pub async fn try_acquire(&self, key: &str, min_interval: TimeDelta) -> bool {
        let now = Utc::now();
        let mut map = self.inner.write().await;
        if let Some(last) = map.get(key)
            && now - *last < min_interval
        {
            trace!(key, "Cooldown gate closed");
            return false;
        }
        map.insert(key.to_string(), now);
        true
    }

    /// Records now as the key's last run without checking the interval.
    /// Manual triggers call this so the next scheduled tick backs off.
    pub async fn touch(&self, key: &str) {
        self.inner.write().await.insert(key.to_string(), Utc::now());
    }

    /// The key's last recorded run, if any.
    pub async fn last_call(&self, key: &str) -> Option<DateTime<Utc>> {
        self.inner.read().await.get(key).copied()
    }
}
