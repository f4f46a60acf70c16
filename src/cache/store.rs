//! Query cache storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use metrics::counter;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::keys::QueryKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_QUERY_CACHE_HIT: &str = "todos_query_cache_hit_total";
pub const METRIC_QUERY_CACHE_MISS: &str = "todos_query_cache_miss_total";

/// Snapshot of one collection.
#[derive(Debug)]
pub struct CacheEntry<T> {
    data: Arc<Vec<T>>,
    version: u64,
    stale: bool,
    updated_at: OffsetDateTime,
}

impl<T> CacheEntry<T> {
    pub fn data(&self) -> &Arc<Vec<T>> {
        &self.data
    }

    /// Bumped on every write to this key, including rollbacks.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }
}

/// Keyed store of immutable collection snapshots.
///
/// `stale_time` bounds how long an entry counts as fresh. `None` keeps an
/// entry fresh until it is explicitly invalidated.
#[derive(Debug)]
pub struct QueryCache<T> {
    entries: RwLock<HashMap<QueryKey, CacheEntry<T>>>,
    stale_time: Option<Duration>,
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> QueryCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stale_time: None,
        }
    }

    pub fn with_stale_time(stale_time: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stale_time: Some(stale_time),
        }
    }

    /// Current collection for `key`, recording a hit or a miss.
    pub fn get(&self, key: QueryKey) -> Option<Arc<Vec<T>>> {
        let data = self.peek(key);
        match data {
            Some(_) => counter!(METRIC_QUERY_CACHE_HIT, "key" => key.as_str()).increment(1),
            None => counter!(METRIC_QUERY_CACHE_MISS, "key" => key.as_str()).increment(1),
        }
        data
    }

    /// Same as [`get`](Self::get) without touching metrics. Used for
    /// mutation snapshots, which are not reads on behalf of a view.
    pub fn peek(&self, key: QueryKey) -> Option<Arc<Vec<T>>> {
        rw_read(&self.entries, SOURCE, "peek")
            .get(&key)
            .map(|entry| Arc::clone(&entry.data))
    }

    pub fn version(&self, key: QueryKey) -> Option<u64> {
        rw_read(&self.entries, SOURCE, "version")
            .get(&key)
            .map(CacheEntry::version)
    }

    pub fn is_stale(&self, key: QueryKey) -> bool {
        rw_read(&self.entries, SOURCE, "is_stale")
            .get(&key)
            .is_some_and(CacheEntry::is_stale)
    }

    /// Present, not invalidated, and younger than `stale_time`.
    pub fn is_fresh(&self, key: QueryKey) -> bool {
        let entries = rw_read(&self.entries, SOURCE, "is_fresh");
        let Some(entry) = entries.get(&key) else {
            return false;
        };
        if entry.stale {
            return false;
        }
        match self.stale_time {
            Some(stale_time) => OffsetDateTime::now_utc() - entry.updated_at < stale_time,
            None => true,
        }
    }

    /// Replaces the collection for `key` and returns the stored snapshot.
    /// The entry becomes fresh.
    pub fn set(&self, key: QueryKey, data: Vec<T>) -> Arc<Vec<T>> {
        let data = Arc::new(data);
        self.write_entry(
            key,
            Arc::clone(&data),
            OffsetDateTime::now_utc(),
            false,
            "set",
        );
        data
    }

    /// Replaces the collection with `f(current)`.
    ///
    /// `f` sees the current collection by reference and must build a new one.
    /// Returning `None` leaves the cache untouched; in particular an absent
    /// entry stays absent. Returns whether a write happened.
    pub fn update<F>(&self, key: QueryKey, f: F) -> bool
    where
        F: FnOnce(Option<&[T]>) -> Option<Vec<T>>,
    {
        let mut entries = rw_write(&self.entries, SOURCE, "update");
        let current = entries.get(&key).map(|entry| Arc::clone(&entry.data));
        let Some(next) = f(current.as_deref().map(Vec::as_slice)) else {
            return false;
        };
        let version = entries.get(&key).map_or(1, |entry| entry.version + 1);
        let stale = entries.get(&key).is_some_and(|entry| entry.stale);
        entries.insert(
            key,
            CacheEntry {
                data: Arc::new(next),
                version,
                stale,
                updated_at: OffsetDateTime::now_utc(),
            },
        );
        true
    }

    /// Puts back a snapshot taken with [`peek`](Self::peek).
    ///
    /// The restored collection is the very `Arc` that was captured. A `None`
    /// snapshot removes the entry, since there was nothing before.
    pub fn restore(&self, key: QueryKey, snapshot: Option<Arc<Vec<T>>>) {
        match snapshot {
            Some(data) => {
                self.write_entry(key, data, OffsetDateTime::now_utc(), false, "restore");
            }
            None => {
                rw_write(&self.entries, SOURCE, "restore").remove(&key);
            }
        }
        debug!(key = %key, "query cache entry restored");
    }

    /// Marks the entry stale so the next read through a query refetches.
    pub fn invalidate(&self, key: QueryKey) {
        if let Some(entry) = rw_write(&self.entries, SOURCE, "invalidate").get_mut(&key) {
            entry.stale = true;
        }
    }

    pub fn remove(&self, key: QueryKey) {
        rw_write(&self.entries, SOURCE, "remove").remove(&key);
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write_entry(
        &self,
        key: QueryKey,
        data: Arc<Vec<T>>,
        updated_at: OffsetDateTime,
        stale: bool,
        op: &'static str,
    ) {
        let mut entries = rw_write(&self.entries, SOURCE, op);
        insert_entry(&mut entries, key, data, updated_at, stale);
    }
}

/// Inserts under a guard the caller already holds, bumping the version.
fn insert_entry<T>(
    entries: &mut HashMap<QueryKey, CacheEntry<T>>,
    key: QueryKey,
    data: Arc<Vec<T>>,
    updated_at: OffsetDateTime,
    stale: bool,
) {
    let version = entries.get(&key).map_or(1, |entry| entry.version + 1);
    entries.insert(
        key,
        CacheEntry {
            data,
            version,
            stale,
            updated_at,
        },
    );
}

/// Serializable form of a whole cache, embedded into server-rendered pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DehydratedState<T> {
    pub queries: Vec<DehydratedQuery<T>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DehydratedQuery<T> {
    pub key: QueryKey,
    pub data: Vec<T>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub stale: bool,
}

impl<T: Clone> QueryCache<T> {
    /// Every entry is included, empty ones too, so a hydrated client never
    /// starts in a loading state for a key the server already resolved.
    pub fn dehydrate(&self) -> DehydratedState<T> {
        let entries = rw_read(&self.entries, SOURCE, "dehydrate");
        let mut queries: Vec<DehydratedQuery<T>> = entries
            .iter()
            .map(|(key, entry)| DehydratedQuery {
                key: *key,
                data: entry.data.as_ref().clone(),
                updated_at: entry.updated_at,
                stale: entry.stale,
            })
            .collect();
        queries.sort_by_key(|query| query.key.as_str());
        DehydratedState { queries }
    }

    /// Seeds entries from a dehydrated state.
    ///
    /// An incoming query only wins over an existing entry when it is newer.
    pub fn hydrate(&self, state: DehydratedState<T>) {
        let mut entries = rw_write(&self.entries, SOURCE, "hydrate");
        for query in state.queries {
            let newer = entries
                .get(&query.key)
                .is_none_or(|entry| entry.updated_at < query.updated_at);
            if newer {
                debug!(key = %query.key, items = query.data.len(), "hydrating query");
                insert_entry(
                    &mut entries,
                    query.key,
                    Arc::new(query.data),
                    query.updated_at,
                    query.stale,
                );
            }
        }
    }
}
