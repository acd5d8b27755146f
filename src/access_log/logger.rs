use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::debug;

use crate::access_log::repo_types::AccessLogEntry;
use crate::config::{LogAppendMode, LogConfig};
use crate::storage::KvStore;

pub const GLOBAL_FEED_KEY: &str = "access_logs";

pub fn user_feed_key(email: &str) -> String {
    format!("log:{email}")
}

/// Capped, newest-first activity feeds kept in a [`KvStore`].
///
/// In [`LogAppendMode::Unsynchronized`] each append is a plain read-modify-write of the
/// whole feed, so two concurrent appends to one feed can drop an entry (last write wins).
/// [`LogAppendMode::Serialized`] takes a per-feed lock first; the lock lives in this
/// process only.
#[derive(Clone)]
pub struct AccessLogger {
    store: Arc<dyn KvStore>,
    config: LogConfig,
    feed_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AccessLogger {
    pub fn new(store: Arc<dyn KvStore>, config: LogConfig) -> Self {
        Self {
            store,
            config,
            feed_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn feed_lock(&self, feed_key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.feed_locks.lock().await;
        locks.entry(feed_key.to_string()).or_default().clone()
    }

    async fn read_feed(&self, feed_key: &str) -> anyhow::Result<Vec<AccessLogEntry>> {
        match self.store.get(feed_key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("decode log feed {feed_key}")),
            None => Ok(Vec::new()),
        }
    }

    /// Drops the feed's lock from the map once no other append holds or awaits it.
    async fn release_feed_lock(&self, feed_key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.feed_locks.lock().await;
        // One reference in the map plus ours.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(feed_key);
        }
    }

    /// Prepends `entry` to the feed and drops the oldest entries beyond `capacity`.
    pub async fn append(
        &self,
        feed_key: &str,
        entry: AccessLogEntry,
        capacity: usize,
    ) -> anyhow::Result<()> {
        match self.config.append_mode {
            LogAppendMode::Unsynchronized => self.prepend(feed_key, entry, capacity).await,
            LogAppendMode::Serialized => {
                let lock = self.feed_lock(feed_key).await;
                let result = {
                    let _guard = lock.lock().await;
                    self.prepend(feed_key, entry, capacity).await
                };
                self.release_feed_lock(feed_key, lock).await;
                result
            }
        }
    }

    async fn prepend(
        &self,
        feed_key: &str,
        entry: AccessLogEntry,
        capacity: usize,
    ) -> anyhow::Result<()> {
        let mut feed = self.read_feed(feed_key).await?;
        feed.insert(0, entry);
        feed.truncate(capacity);
        let raw = serde_json::to_string(&feed).context("encode log feed")?;
        self.store.put(feed_key, raw).await?;
        debug!(feed = feed_key, len = feed.len(), "log feed updated");
        Ok(())
    }

    /// Writes the entry to the global feed, then to the user's own feed.
    /// A global-feed failure returns before the user feed is touched.
    pub async fn record(&self, entry: AccessLogEntry) -> anyhow::Result<()> {
        let user_key = user_feed_key(&entry.email);
        self.append(GLOBAL_FEED_KEY, entry.clone(), self.config.global_capacity)
            .await?;
        self.append(&user_key, entry, self.config.user_capacity)
            .await
    }

    pub async fn list(&self) -> anyhow::Result<Vec<AccessLogEntry>> {
        self.read_feed(GLOBAL_FEED_KEY).await
    }

    pub async fn list_for(&self, email: &str) -> anyhow::Result<Vec<AccessLogEntry>> {
        self.read_feed(&user_feed_key(email)).await
    }
}
