//! Query Cache
//!
//! Keyed, stale-time-aware read cache with a bounded retry policy and
//! explicit or domain-wide invalidation.
//!
//! # Design
//!
//! - A read against a fresh entry returns the cached data without touching
//!   the network.
//! - A read against a stale entry returns the last known data immediately
//!   and refetches in the background (stale-while-revalidate).
//! - Concurrent reads for the same key coalesce onto a single in-flight
//!   fetch; every waiter receives that fetch's outcome.
//! - Invalidation marks entries stale. Entries with live observers refetch
//!   eagerly; unobserved entries refetch lazily on their next read.
//!
//! The entry map is guarded by a `parking_lot` mutex held only for short
//! synchronous sections; no lock is ever held across an await point.
//! In-flight coalescing rides on a `tokio::sync::watch` channel whose
//! sender lives in the entry for exactly the duration of the fetch.

mod key;

pub use key::{KeyPart, QueryKey};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::ApiError;

/// Default staleness threshold for registered queries
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Default retry attempt bound
pub const DEFAULT_RETRY: u32 = 3;

/// A stored fetch function; re-invoked for background refetches
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Value, ApiError>> + Send + Sync>;

/// Lifecycle state of one cache entry.
///
/// Transitions are monotonic within a single fetch cycle:
/// `Idle -> Fetching -> Success | Error`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryState {
    /// Registered, never fetched
    Idle,
    /// A fetch is in flight
    Fetching,
    /// Last fetch produced data
    Success,
    /// Last fetch exhausted its retries
    Error,
}

/// Parameters of a registered query
#[derive(Clone, Debug)]
pub struct QuerySpec {
    /// Cache key
    pub key: QueryKey,
    /// How long a result stays fresh
    pub stale_time: Duration,
    /// Retry attempt bound; every failure is retried identically
    pub retry: u32,
}

impl QuerySpec {
    /// Create a spec with the default stale time and retry bound
    #[must_use]
    pub fn new(key: QueryKey) -> Self {
        Self {
            key,
            stale_time: DEFAULT_STALE_TIME,
            retry: DEFAULT_RETRY,
        }
    }

    /// Set the staleness threshold
    #[must_use]
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Set the retry attempt bound
    #[must_use]
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }
}

/// Derived status of a composite read, e.g. a dashboard load.
///
/// Computed from the constituent entries on demand, never stored, so it
/// cannot diverge from them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositeStatus {
    /// Some constituent is fetching with no prior data
    pub is_loading: bool,
    /// Some constituent's latest attempt ended in error
    pub is_error: bool,
}

/// Cache tuning knobs
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Delay between retry attempts
    pub retry_delay: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(200),
        }
    }
}

struct Entry {
    state: QueryState,
    data: Option<Value>,
    error: Option<ApiError>,
    fetched_at: Option<Instant>,
    stale_time: Duration,
    invalidated: bool,
    observers: usize,
    retry: u32,
    fetcher: Option<Fetcher>,
    // Present exactly while a fetch is in flight; waiters subscribe to it.
    inflight: Option<watch::Sender<()>>,
}

impl Entry {
    fn new(stale_time: Duration, retry: u32) -> Self {
        Self {
            state: QueryState::Idle,
            data: None,
            error: None,
            fetched_at: None,
            stale_time,
            invalidated: false,
            observers: 0,
            retry,
            fetcher: None,
            inflight: None,
        }
    }

    fn is_fresh(&self) -> bool {
        !self.invalidated
            && self.state == QueryState::Success
            && self
                .fetched_at
                .is_some_and(|at| at.elapsed() < self.stale_time)
    }

    fn begin_fetch(&mut self) -> watch::Sender<()> {
        let (tx, _rx) = watch::channel(());
        self.inflight = Some(tx.clone());
        self.state = QueryState::Fetching;
        tx
    }
}

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    retry_delay: Duration,
}

/// The process-wide read cache. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

enum ReadAction {
    Hit(Value),
    StaleHit(Value),
    Run,
    Wait(watch::Receiver<()>),
}

impl QueryCache {
    /// Create an empty cache
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                retry_delay: config.retry_delay,
            }),
        }
    }

    /// Read through the cache.
    ///
    /// Registers `fetcher` for the key so invalidation-driven refetches can
    /// re-invoke it later. Fresh entries resolve without a network call.
    pub async fn fetch(&self, spec: &QuerySpec, fetcher: Fetcher) -> Result<Value, ApiError> {
        loop {
            let action = {
                let mut entries = self.inner.entries.lock();
                let entry = entries
                    .entry(spec.key.clone())
                    .or_insert_with(|| Entry::new(spec.stale_time, spec.retry));
                entry.stale_time = spec.stale_time;
                entry.retry = spec.retry;
                entry.fetcher = Some(Arc::clone(&fetcher));

                if let Some(tx) = &entry.inflight {
                    ReadAction::Wait(tx.subscribe())
                } else if entry.is_fresh() {
                    ReadAction::Hit(entry.data.clone().unwrap_or(Value::Null))
                } else if let Some(data) = entry.data.clone() {
                    entry.begin_fetch();
                    ReadAction::StaleHit(data)
                } else {
                    entry.begin_fetch();
                    ReadAction::Run
                }
            };

            match action {
                ReadAction::Hit(data) => return Ok(data),
                ReadAction::StaleHit(data) => {
                    self.spawn_refetch(spec.key.clone());
                    return Ok(data);
                }
                ReadAction::Run => return self.run_fetch(&spec.key).await,
                ReadAction::Wait(mut rx) => {
                    // The sender is removed from the entry before the result
                    // is announced, so a closed channel also means the fetch
                    // finished.
                    let _ = rx.changed().await;
                    if let Some(result) = self.settled_result(&spec.key) {
                        return result;
                    }
                    // Entry was evicted or re-entered Fetching meanwhile.
                }
            }
        }
    }

    /// Write a value directly, e.g. authoritative state returned by a
    /// mutation. The entry becomes fresh.
    pub fn put(&self, key: QueryKey, data: Value) {
        let mut entries = self.inner.entries.lock();
        let entry = entries
            .entry(key)
            .or_insert_with(|| Entry::new(DEFAULT_STALE_TIME, DEFAULT_RETRY));
        entry.data = Some(data);
        entry.error = None;
        entry.state = QueryState::Success;
        entry.fetched_at = Some(Instant::now());
        entry.invalidated = false;
    }

    /// Mark the exact key stale
    pub fn invalidate(&self, key: &QueryKey) {
        self.invalidate_where(|candidate| candidate == key);
    }

    /// Mark every key under the prefix stale (domain-wide invalidation)
    pub fn invalidate_prefix(&self, prefix: &QueryKey) {
        self.invalidate_where(|candidate| candidate.starts_with(prefix));
    }

    /// Drop every entry. Subsequent reads refetch from the network.
    pub fn clear(&self) {
        self.inner.entries.lock().clear();
    }

    /// Register a consumer for the key. Observed entries refetch eagerly
    /// when invalidated; the registration ends when the guard drops.
    #[must_use]
    pub fn observe(&self, key: QueryKey) -> QueryObserver {
        {
            let mut entries = self.inner.entries.lock();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(DEFAULT_STALE_TIME, DEFAULT_RETRY));
            entry.observers += 1;
        }
        QueryObserver {
            cache: self.clone(),
            key,
        }
    }

    /// Current state of the key's entry
    #[must_use]
    pub fn state(&self, key: &QueryKey) -> QueryState {
        self.inner
            .entries
            .lock()
            .get(key)
            .map_or(QueryState::Idle, |entry| entry.state)
    }

    /// Last known data for the key, fresh or stale
    #[must_use]
    pub fn data(&self, key: &QueryKey) -> Option<Value> {
        self.inner
            .entries
            .lock()
            .get(key)
            .and_then(|entry| entry.data.clone())
    }

    /// Whether the key's entry is fresh
    #[must_use]
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.inner
            .entries
            .lock()
            .get(key)
            .is_some_and(Entry::is_fresh)
    }

    /// Number of entries currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Derived status over a set of constituent keys
    #[must_use]
    pub fn composite_status(&self, keys: &[QueryKey]) -> CompositeStatus {
        let entries = self.inner.entries.lock();
        let mut status = CompositeStatus::default();
        for key in keys {
            if let Some(entry) = entries.get(key) {
                if entry.state == QueryState::Fetching && entry.data.is_none() {
                    status.is_loading = true;
                }
                if entry.state == QueryState::Error {
                    status.is_error = true;
                }
            }
        }
        status
    }

    fn invalidate_where(&self, matches: impl Fn(&QueryKey) -> bool) {
        let mut to_refetch = Vec::new();
        {
            let mut entries = self.inner.entries.lock();
            for (key, entry) in entries.iter_mut() {
                if !matches(key) {
                    continue;
                }
                entry.invalidated = true;
                if entry.observers > 0 && entry.inflight.is_none() && entry.fetcher.is_some() {
                    entry.begin_fetch();
                    to_refetch.push(key.clone());
                }
            }
        }
        for key in to_refetch {
            self.spawn_refetch(key);
        }
    }

    fn spawn_refetch(&self, key: QueryKey) {
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(error) = cache.run_fetch(&key).await {
                tracing::debug!(key = %key, error = %error, "background refetch failed");
            }
        });
    }

    /// Drive the entry's registered fetcher to completion, with retries,
    /// and record the outcome. The caller must have moved the entry into
    /// `Fetching` first.
    async fn run_fetch(&self, key: &QueryKey) -> Result<Value, ApiError> {
        let (fetcher, attempts) = {
            let entries = self.inner.entries.lock();
            let Some(entry) = entries.get(key) else {
                return Err(ApiError::transport("Query entry evicted mid-fetch"));
            };
            let Some(fetcher) = entry.fetcher.clone() else {
                return Err(ApiError::transport("No fetcher registered for query"));
            };
            (fetcher, entry.retry.max(1))
        };

        let mut result = fetcher().await;
        let mut attempt = 1;
        while result.is_err() && attempt < attempts {
            tokio::time::sleep(self.inner.retry_delay).await;
            result = fetcher().await;
            attempt += 1;
        }

        let announce = {
            let mut entries = self.inner.entries.lock();
            match entries.get_mut(key) {
                Some(entry) => {
                    match &result {
                        Ok(data) => {
                            entry.data = Some(data.clone());
                            entry.error = None;
                            entry.state = QueryState::Success;
                            entry.invalidated = false;
                        }
                        Err(error) => {
                            // Stale data is kept for display, but `state`
                            // marks the error as the authoritative outcome.
                            entry.error = Some(error.clone());
                            entry.state = QueryState::Error;
                        }
                    }
                    entry.fetched_at = Some(Instant::now());
                    entry.inflight.take()
                }
                None => None,
            }
        };
        if let Some(tx) = announce {
            let _ = tx.send(());
        }

        result
    }

    fn settled_result(&self, key: &QueryKey) -> Option<Result<Value, ApiError>> {
        let entries = self.inner.entries.lock();
        let entry = entries.get(key)?;
        match entry.state {
            QueryState::Success => entry.data.clone().map(Ok),
            QueryState::Error => entry.error.clone().map(Err),
            QueryState::Idle | QueryState::Fetching => None,
        }
    }
}

/// RAII registration of a consumer for one key
pub struct QueryObserver {
    cache: QueryCache,
    key: QueryKey,
}

impl QueryObserver {
    /// The observed key
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for QueryObserver {
    fn drop(&mut self) {
        let mut entries = self.cache.inner.entries.lock();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.observers = entry.observers.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_cache() -> QueryCache {
        QueryCache::new(CacheConfig {
            retry_delay: Duration::ZERO,
        })
    }

    fn counting_fetcher(calls: Arc<AtomicUsize>, value: Value) -> Fetcher {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            let value = value.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            })
        })
    }

    fn slow_counting_fetcher(calls: Arc<AtomicUsize>, value: Value) -> Fetcher {
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            let value = value.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(value)
            })
        })
    }

    fn key() -> QueryKey {
        QueryKey::new("analytics").push("total-students")
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_network() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = QuerySpec::new(key());
        let fetcher = counting_fetcher(Arc::clone(&calls), json!({"total_students": 10}));

        let first = cache.fetch(&spec, Arc::clone(&fetcher)).await.unwrap();
        let second = cache.fetch(&spec, fetcher).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_fresh(&spec.key));
    }

    #[tokio::test]
    async fn test_concurrent_identical_reads_share_one_fetch() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = QuerySpec::new(key());
        let fetcher = slow_counting_fetcher(Arc::clone(&calls), json!(7));

        let (a, b) = tokio::join!(
            cache.fetch(&spec, Arc::clone(&fetcher)),
            cache.fetch(&spec, Arc::clone(&fetcher)),
        );

        assert_eq!(a.unwrap(), json!(7));
        assert_eq!(b.unwrap(), json!(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_read_returns_data_and_refetches_once() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = QuerySpec::new(key()).with_stale_time(Duration::ZERO);
        let fetcher = counting_fetcher(Arc::clone(&calls), json!(1));

        cache.fetch(&spec, Arc::clone(&fetcher)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Entry is immediately stale: the read returns the last data and
        // kicks exactly one background refetch.
        let stale = cache.fetch(&spec, Arc::clone(&fetcher)).await.unwrap();
        assert_eq!(stale, json!(1));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = QuerySpec::new(key()).with_retry(3);
        let fetcher: Fetcher = {
            let calls = Arc::clone(&calls);
            Arc::new(move || {
                let calls = Arc::clone(&calls);
                Box::pin(async move {
                    let attempt = calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(ApiError::transport("flaky"))
                    } else {
                        Ok(json!("ok"))
                    }
                })
            })
        };

        let result = cache.fetch(&spec, fetcher).await.unwrap();
        assert_eq!(result, json!("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.state(&spec.key), QueryState::Success);
    }

    #[tokio::test]
    async fn test_retries_exhausted_surface_error() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = QuerySpec::new(key()).with_retry(3);
        let fetcher: Fetcher = {
            let calls = Arc::clone(&calls);
            Arc::new(move || {
                let calls = Arc::clone(&calls);
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::transport("down"))
                })
            })
        };

        let result = cache.fetch(&spec, fetcher).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.state(&spec.key), QueryState::Error);
    }

    #[tokio::test]
    async fn test_invalidate_without_observer_is_lazy() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = QuerySpec::new(key());
        let fetcher = counting_fetcher(Arc::clone(&calls), json!(1));

        cache.fetch(&spec, Arc::clone(&fetcher)).await.unwrap();
        cache.invalidate(&spec.key);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "no eager refetch");
        assert!(!cache.is_fresh(&spec.key));

        // Next access refetches in the background.
        cache.fetch(&spec, Arc::clone(&fetcher)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_with_observer_refetches_eagerly() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = QuerySpec::new(key());
        let fetcher = counting_fetcher(Arc::clone(&calls), json!(1));

        cache.fetch(&spec, Arc::clone(&fetcher)).await.unwrap();
        let observer = cache.observe(spec.key.clone());

        cache.invalidate(&spec.key);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        drop(observer);
        cache.invalidate(&spec.key);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2, "lazy again once unobserved");
    }

    #[tokio::test]
    async fn test_prefix_invalidation_spares_other_domains() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let analytics = QuerySpec::new(key());
        let chat = QuerySpec::new(QueryKey::new("chat").push("history").push("t1"));
        let fetcher = counting_fetcher(Arc::clone(&calls), json!(1));

        cache.fetch(&analytics, Arc::clone(&fetcher)).await.unwrap();
        cache.fetch(&chat, Arc::clone(&fetcher)).await.unwrap();

        cache.invalidate_prefix(&QueryKey::new("analytics"));
        assert!(!cache.is_fresh(&analytics.key));
        assert!(cache.is_fresh(&chat.key));
    }

    #[tokio::test]
    async fn test_clear_empties_cache() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = QuerySpec::new(key());
        let fetcher = counting_fetcher(Arc::clone(&calls), json!(1));

        cache.fetch(&spec, fetcher).await.unwrap();
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.is_fresh(&spec.key));
    }

    #[tokio::test]
    async fn test_put_makes_entry_fresh() {
        let cache = test_cache();
        let k = QueryKey::new("chat").push("history").push("t1");
        cache.put(k.clone(), json!([{"id": "m1"}]));
        assert!(cache.is_fresh(&k));
        assert_eq!(cache.data(&k).unwrap()[0]["id"], "m1");
    }

    #[tokio::test]
    async fn test_composite_status_is_derived() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let ok = QuerySpec::new(key());
        let bad = QuerySpec::new(QueryKey::new("analytics").push("active-students"));
        let fetcher = counting_fetcher(Arc::clone(&calls), json!(1));
        let failing: Fetcher =
            Arc::new(|| Box::pin(async { Err(ApiError::transport("down")) }));

        cache.fetch(&ok, fetcher).await.unwrap();
        let _ = cache.fetch(&bad, failing).await;

        let status = cache.composite_status(&[ok.key.clone(), bad.key.clone()]);
        assert!(!status.is_loading);
        assert!(status.is_error);

        let status = cache.composite_status(&[ok.key.clone()]);
        assert_eq!(status, CompositeStatus::default());
    }
}
