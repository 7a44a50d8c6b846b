//! Merge Engine: fetches all sources, normalizes, dedups, sorts, and builds
//! the cache snapshot that the HTTP surface reads from.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::feed::{self, Item};

/// Max sources fetched simultaneously.
const MAX_CONCURRENT_FETCHES: usize = 10;

/// One complete merged snapshot: deduplicated items in date-descending
/// order, plus the time the snapshot was built.
#[derive(Debug, Clone)]
pub struct Cache {
    pub items: Vec<Item>,
    pub last_build: DateTime<Utc>,
}

impl Cache {
    /// An empty but valid snapshot, used before the first refresh completes.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            last_build: Utc::now(),
        }
    }
}

/// Clonable handle over the process-wide cache snapshot.
///
/// Readers take an `Arc` to whichever complete snapshot is current;
/// `replace` swaps the snapshot atomically, so a reader observes either the
/// old-complete or new-complete cache, never a partial merge.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<RwLock<Arc<Cache>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(Cache::empty()))),
        }
    }

    /// Current snapshot. Cheap (an `Arc` clone) and never blocks on an
    /// in-flight refresh — replacement only holds the write lock for the
    /// pointer swap.
    pub async fn snapshot(&self) -> Arc<Cache> {
        self.inner.read().await.clone()
    }

    /// Atomically publish a freshly built snapshot.
    pub async fn replace(&self, cache: Cache) {
        *self.inner.write().await = Arc::new(cache);
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one full refresh cycle: fetch every source, normalize surviving
/// items, dedup by canonical link, sort date-descending.
///
/// Never fails: a failing source is logged and contributes zero items this
/// cycle, and all sources failing yields a valid empty cache with a fresh
/// `last_build`.
///
/// Fetches run with bounded concurrency but results are collected in
/// configured source order — dedup keeps the first occurrence of a link in
/// source-then-item order, so ordering here is load-bearing.
pub async fn refresh(client: &reqwest::Client, sources: &[String]) -> Cache {
    // Each fetch future owns its client handle and source URL, so the whole
    // refresh future stays Send when run on a spawned task
    let fetches: Vec<_> = sources
        .iter()
        .map(|source| {
            let client = client.clone();
            let source = source.clone();
            async move {
                let result = feed::fetch_source(&client, &source).await;
                (source, result)
            }
        })
        .collect();

    let results: Vec<(String, Result<feed::RawFeed, feed::FetchError>)> =
        stream::iter(fetches)
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;

    let mut seen: HashSet<String> = HashSet::new();
    let mut items: Vec<Item> = Vec::new();
    let mut failed = 0usize;

    for (source, result) in results {
        match result {
            Ok(raw_feed) => {
                tracing::debug!(
                    source = %source,
                    title = %raw_feed.title,
                    items = raw_feed.items.len(),
                    "Fetched source"
                );
                for raw in raw_feed.items {
                    let Some(item) = feed::normalize(raw, &source) else {
                        continue; // no resolvable link: filtered, not an error
                    };
                    if seen.insert(item.link.trim().to_string()) {
                        items.push(item);
                    }
                }
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(source = %source, error = %e, "Source contributes no items this cycle");
            }
        }
    }

    // Stable sort: equal dates keep their first-seen (source-then-item) order
    items.sort_by(|a, b| b.date.cmp(&a.date));

    tracing::info!(
        items = items.len(),
        sources = sources.len(),
        failed = failed,
        "Refresh cycle complete"
    );

    Cache {
        items,
        last_build: Utc::now(),
    }
}
