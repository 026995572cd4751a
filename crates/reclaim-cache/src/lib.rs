//! Read-through TTL cache for Reclaim API responses.
//!
//! Reads go through [`TtlCache::get_or_compute`]: a live entry is served
//! directly, anything else runs the supplied compute future and stores the
//! result. Mutations call [`TtlCache::invalidate`] with a namespace prefix so
//! the next read observes the change.
//!
//! The cache is a plain value the caller owns and passes where needed. Time
//! is measured with [`tokio::time::Instant`], so tests drive expiry with a
//! paused clock instead of sleeping.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

/// Default entry lifetime for read caching.
///
/// Namespaces pick their own TTLs; upstream data ranges from live moment
/// state (15 s) to daily analytics (300 s), with task and habit lists in
/// between at 60-120 s.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Counters exposed by [`TtlCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups served from a live entry.
    pub hits: u64,
    /// Lookups that ran the compute path, including zero-TTL bypasses.
    pub misses: u64,
    /// Entries currently stored and not yet expired.
    pub live_entries: usize,
}

struct Entry {
    value: Value,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<(String, String), Entry>,
    hits: u64,
    misses: u64,
}

/// In-memory cache keyed by `(namespace, key)` with per-entry TTL.
#[derive(Default)]
pub struct TtlCache {
    inner: Mutex<Inner>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `(namespace, key)` or computes, stores
    /// and returns a fresh one.
    ///
    /// An entry observed at or past its expiry is removed and recomputed; a
    /// stale value is never served. With `ttl` of zero the lookup and store
    /// are skipped entirely, so every call computes.
    ///
    /// Failures and `Value::Null` results are never stored: an `Err` from
    /// `compute` propagates unchanged, and a null (the shape of an empty-body
    /// 2xx) would otherwise pin "no content" for the full TTL.
    ///
    /// Concurrent misses on the same key are not de-duplicated. Both callers
    /// run `compute` and the later store wins; the lock is never held while
    /// `compute` runs, so lookups on other keys proceed in the meantime.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        namespace: &str,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        let entry_key = (namespace.to_string(), key.to_string());

        if ttl.is_zero() {
            self.lock().misses += 1;
        } else {
            let now = Instant::now();
            let mut inner = self.lock();
            let mut live = None;
            if let Some(entry) = inner.entries.get(&entry_key) {
                if now < entry.expires_at {
                    live = Some(entry.value.clone());
                }
            }
            match live {
                Some(value) => {
                    inner.hits += 1;
                    tracing::debug!(namespace, key, "cache hit");
                    return Ok(value);
                }
                None => {
                    // Removes the entry when it was present but expired.
                    inner.entries.remove(&entry_key);
                    inner.misses += 1;
                }
            }
        }

        tracing::debug!(namespace, key, "cache miss");
        let value = compute().await?;

        if !ttl.is_zero() && !value.is_null() {
            let entry = Entry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            };
            self.lock().entries.insert(entry_key, entry);
        }

        Ok(value)
    }

    /// Removes every entry whose namespace starts with `namespace_prefix`
    /// and returns how many were dropped.
    ///
    /// An empty prefix clears the whole cache. Hit and miss counters are
    /// left untouched.
    pub fn invalidate(&self, namespace_prefix: &str) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|(namespace, _), _| !namespace.starts_with(namespace_prefix));
        let removed = before - inner.entries.len();
        if removed > 0 {
            tracing::debug!(prefix = namespace_prefix, removed, "invalidated cache entries");
        }
        removed
    }

    /// Point-in-time counters. Reading them does not change cache contents.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let now = Instant::now();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            live_entries: inner
                .entries
                .values()
                .filter(|entry| now < entry.expires_at)
                .count(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("cache mutex poisoned")
    }
}

/// Derives a deterministic cache key from query parameters.
///
/// Pairs are sorted by parameter name (repeated names keep their relative
/// order), so two requests with the same parameters in different order map
/// to the same entry while different parameters never collide.
pub fn canonical_key(query: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    serde_json::to_string(&pairs).expect("string pairs serialize")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::future::join_all;
    use serde_json::json;
    use tokio::sync::Barrier;
    use tokio::time::advance;

    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn second_read_within_ttl_is_served_from_cache() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_compute("tasks", "list", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(json!([{"id": 1, "title": "write report"}]))
                })
                .await
                .unwrap();
            assert_eq!(value[0]["id"], 1);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.live_entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_at_expiry_is_recomputed_not_served() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);
        let (cache, calls) = (&cache, &calls);
        let fetch = |n: u64| async move {
            cache
                .get_or_compute("tasks", "list", Duration::from_secs(60), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(json!({"generation": n}))
                })
                .await
                .unwrap()
        };

        assert_eq!(fetch(1).await["generation"], 1);

        advance(Duration::from_secs(59)).await;
        assert_eq!(fetch(2).await["generation"], 1, "still live one second early");

        advance(Duration::from_secs(1)).await;
        assert_eq!(fetch(3).await["generation"], 3, "expiry boundary is a miss");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2, live_entries: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_always_computes() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .get_or_compute("moments", "current", Duration::ZERO, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(json!({"state": "FOCUS"}))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let stats = cache.stats();
        assert_eq!(stats.misses, 3);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.live_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_compute_is_not_cached() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        let err = cache
            .get_or_compute("tasks", "list", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Value, String>("upstream unavailable".into())
            })
            .await
            .unwrap_err();
        assert_eq!(err, "upstream unavailable");

        let value = cache
            .get_or_compute("tasks", "list", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(json!({"recovered": true}))
            })
            .await
            .unwrap();
        assert_eq!(value["recovered"], true);
        assert_eq!(calls.load(Ordering::SeqCst), 2, "the failure was not served");
    }

    #[tokio::test(start_paused = true)]
    async fn null_result_is_not_cached() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_compute("tasks", "detail:9", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(Value::Null)
                })
                .await
                .unwrap();
            assert!(value.is_null());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().live_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_matches_namespaces_by_prefix() {
        let cache = TtlCache::new();
        let cache = &cache;
        let seed = |namespace: &'static str, value: Value| async move {
            cache
                .get_or_compute(namespace, "list", Duration::from_secs(60), move || async move {
                    Ok::<_, String>(value)
                })
                .await
                .unwrap();
        };
        seed("tasks", json!(1)).await;
        seed("tasks:completed", json!(2)).await;
        seed("habits", json!(3)).await;

        assert_eq!(cache.invalidate("tasks"), 2);
        assert_eq!(cache.invalidate("tasks"), 0, "already gone");
        assert_eq!(cache.stats().live_entries, 1);

        let calls = AtomicUsize::new(0);
        cache
            .get_or_compute("habits", "list", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(json!(0))
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0, "unrelated namespace untouched");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_prefix_clears_everything() {
        let cache = TtlCache::new();
        for namespace in ["tasks", "habits", "events:2026-01-01:2026-01-07"] {
            cache
                .get_or_compute(namespace, "list", Duration::from_secs(60), || async {
                    Ok::<_, String>(json!({}))
                })
                .await
                .unwrap();
        }

        assert_eq!(cache.invalidate(""), 3);
        assert_eq!(cache.stats().live_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_reports_without_mutating() {
        let cache = TtlCache::new();
        cache
            .get_or_compute("tasks", "list", Duration::from_secs(60), || async {
                Ok::<_, String>(json!([]))
            })
            .await
            .unwrap();

        advance(Duration::from_secs(120)).await;
        let first = cache.stats();
        assert_eq!(first.live_entries, 0, "expired entry is not counted");
        assert_eq!(first, cache.stats(), "reading stats changes nothing");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_compute_on_one_key_does_not_block_others() {
        let cache = TtlCache::new();
        let cache = &cache;
        let started = Instant::now();

        let lookups = (0..5).map(|i| async move {
            let key = format!("detail:{i}");
            cache
                .get_or_compute("tasks", &key, Duration::from_secs(60), move || async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok::<_, String>(json!({"id": i}))
                })
                .await
                .unwrap()
        });
        let values = join_all(lookups).await;

        let elapsed = started.elapsed();
        assert!(
            elapsed < Duration::from_millis(200),
            "five 100ms computes overlapped, took {elapsed:?}"
        );
        for (i, value) in values.iter().enumerate() {
            assert_eq!(value["id"], i);
        }
        assert_eq!(cache.stats().live_entries, 5);
    }

    #[tokio::test]
    async fn racing_misses_on_one_key_both_compute() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(2);
        let (cache, calls, barrier) = (&cache, &calls, &barrier);

        let lookup = |marker: u64| async move {
            cache
                .get_or_compute("tasks", "list", Duration::from_secs(60), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // Holds both computes in flight so neither sees the
                    // other's store.
                    barrier.wait().await;
                    Ok::<_, String>(json!({"from": marker}))
                })
                .await
                .unwrap()
        };

        let (a, b) = tokio::join!(lookup(1), lookup(2));
        assert_eq!(a["from"], 1);
        assert_eq!(b["from"], 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2, "misses are not de-duplicated");

        let stats = cache.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.live_entries, 1, "later store wins");
    }

    #[test]
    fn canonical_key_ignores_parameter_order() {
        let forward = canonical_key(&pairs(&[("start", "2026-01-01"), ("end", "2026-01-07")]));
        let reversed = canonical_key(&pairs(&[("end", "2026-01-07"), ("start", "2026-01-01")]));
        assert_eq!(forward, reversed);
    }

    #[test]
    fn canonical_key_separates_different_values() {
        let jan = canonical_key(&pairs(&[("start", "2026-01-01"), ("end", "2026-01-07")]));
        let feb = canonical_key(&pairs(&[("start", "2026-02-01"), ("end", "2026-02-07")]));
        assert_ne!(jan, feb);
    }

    #[test]
    fn canonical_key_is_unambiguous_for_empty_and_repeated_names() {
        assert_eq!(canonical_key(&[]), "[]");

        let twice = canonical_key(&pairs(&[("status", "NEW"), ("status", "SCHEDULED")]));
        let once = canonical_key(&pairs(&[("status", "NEW")]));
        assert_ne!(twice, once);
    }
}
