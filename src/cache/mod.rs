//! Concurrent metrics cache.
//!
//! Three logical namespaces memoize derived results: by content hash, by
//! symbol identity, and by (language, content) parser key. Reads and
//! writes go through a sharded concurrent map and never block each other;
//! counters are plain atomics. Expired entries die lazily on read or
//! eagerly in a periodic sweep. Size bounds are approximate: eviction
//! scans for the oldest entry without a lock, and a racing pair of
//! evictions removing two entries is acceptable.

use crate::FileId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

/// Empirically calibrated bytes per entry for memory estimates. Keep in
/// step with the eviction policy if either is recalibrated.
const BYTES_PER_ENTRY: u64 = 322;

/// Nanoseconds since the first cache observation in this process.
fn monotonic_ns() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

fn hex_prefix(digest: &[u8], bytes: usize) -> String {
    digest[..bytes.min(digest.len())]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Cache configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_content_entries: usize,
    pub max_symbol_entries: usize,
    pub max_parser_entries: usize,
    pub ttl: Duration,
    pub enable_content: bool,
    pub enable_symbol: bool,
    pub enable_parser: bool,
    pub auto_cleanup: bool,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_content_entries: 400,
            max_symbol_entries: 400,
            max_parser_entries: 200,
            ttl: Duration::from_secs(2 * 60 * 60),
            enable_content: true,
            enable_symbol: true,
            enable_parser: true,
            auto_cleanup: false,
            cleanup_interval: Duration::from_secs(10 * 60),
        }
    }
}

struct CacheEntry<V> {
    payload: V,
    cached_at_ns: u64,
    access_count: AtomicU64,
    key_hash: String,
    symbol_name: String,
    file_id: u32,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_requests: u64,
    pub hit_rate: f64,
    pub content_entries: usize,
    pub symbol_entries: usize,
    pub parser_entries: usize,
    pub total_entries: usize,
    pub created_at: DateTime<Utc>,
    pub last_cleanup: DateTime<Utc>,
    pub uptime: Duration,
    pub parser_hits: u64,
    pub parser_hit_rate: f64,
    pub estimated_memory_kb: u64,
}

/// Stats plus configuration and a coarse health tag.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub max_entries: usize,
    pub ttl: Duration,
    pub enable_content: bool,
    pub enable_symbol: bool,
    pub health: &'static str,
}

fn health_tag(hit_rate: f64) -> &'static str {
    if hit_rate >= 0.95 {
        "excellent"
    } else if hit_rate >= 0.85 {
        "good"
    } else if hit_rate >= 0.70 {
        "fair"
    } else {
        "poor"
    }
}

/// Concurrent memoization layer over computed metrics.
pub struct MetricsCache<V> {
    content: DashMap<String, Arc<CacheEntry<V>>>,
    symbol: DashMap<String, Arc<CacheEntry<V>>>,
    parser: DashMap<String, Arc<CacheEntry<V>>>,
    config: CacheConfig,
    ttl_ns: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    total_requests: AtomicU64,
    parser_hits: AtomicU64,
    parser_requests: AtomicU64,
    // Approximate per-namespace counters driving eviction.
    content_count: AtomicU64,
    symbol_count: AtomicU64,
    parser_count: AtomicU64,
    created_at: DateTime<Utc>,
    last_cleanup: Mutex<DateTime<Utc>>,
    started_ns: u64,
}

impl<V: Clone + Send + Sync + 'static> MetricsCache<V> {
    pub fn new(config: CacheConfig) -> Arc<Self> {
        let now = Utc::now();
        Arc::new(Self {
            content: DashMap::new(),
            symbol: DashMap::new(),
            parser: DashMap::new(),
            ttl_ns: AtomicU64::new(config.ttl.as_nanos() as u64),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            parser_hits: AtomicU64::new(0),
            parser_requests: AtomicU64::new(0),
            content_count: AtomicU64::new(0),
            symbol_count: AtomicU64::new(0),
            parser_count: AtomicU64::new(0),
            created_at: now,
            last_cleanup: Mutex::new(now),
            started_ns: monotonic_ns(),
        })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(CacheConfig::default())
    }

    /// Start the periodic cleanup task, when configured.
    ///
    /// The task holds only a weak handle: dropping the last strong
    /// reference to the cache ends the sweep.
    pub fn start_auto_cleanup(self: &Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if !self.config.auto_cleanup {
            return None;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        let interval = self.config.cleanup_interval;
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(cache) => cache.clean_expired(),
                    None => break,
                }
            }
        }))
    }

    fn content_key(content: &[u8], symbol_name: &str) -> String {
        let digest = Sha256::digest(content);
        format!("{}:{symbol_name}", hex_prefix(&digest, 16))
    }

    fn symbol_key(file_id: FileId, symbol_name: &str) -> String {
        format!("{}:{symbol_name}", file_id.value())
    }

    fn parser_key(language: &str, content: &[u8], symbol_name: &str) -> String {
        let digest = Sha256::digest(content);
        format!("{language}:{}:{symbol_name}", hex_prefix(&digest, 12))
    }

    fn is_expired(&self, entry: &CacheEntry<V>) -> bool {
        monotonic_ns().saturating_sub(entry.cached_at_ns) > self.ttl_ns.load(Ordering::Relaxed)
    }

    /// Probe one namespace; expired entries are deleted and read as a miss.
    fn probe(
        &self,
        map: &DashMap<String, Arc<CacheEntry<V>>>,
        count: &AtomicU64,
        key: &str,
    ) -> Option<V> {
        let entry = map.get(key).map(|e| Arc::clone(&e))?;
        if self.is_expired(&entry) {
            if map
                .remove_if(key, |_, current| {
                    current.cached_at_ns == entry.cached_at_ns
                })
                .is_some()
            {
                count.fetch_sub(1, Ordering::Relaxed);
            }
            return None;
        }
        entry.access_count.fetch_add(1, Ordering::Relaxed);
        Some(entry.payload.clone())
    }

    /// Content cache first (when enabled and content is given), then the
    /// symbol cache.
    pub fn get(&self, content: Option<&[u8]>, file_id: FileId, symbol_name: &str) -> Option<V> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if self.config.enable_content {
            if let Some(content) = content {
                let key = Self::content_key(content, symbol_name);
                if let Some(payload) = self.probe(&self.content, &self.content_count, &key) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(payload);
                }
            }
        }
        if self.config.enable_symbol {
            let key = Self::symbol_key(file_id, symbol_name);
            if let Some(payload) = self.probe(&self.symbol, &self.symbol_count, &key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(payload);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Parser cache first, then content, then symbol.
    pub fn get_with_language(
        &self,
        language: &str,
        content: &[u8],
        file_id: FileId,
        symbol_name: &str,
    ) -> Option<V> {
        self.parser_requests.fetch_add(1, Ordering::Relaxed);
        if self.config.enable_parser {
            let key = Self::parser_key(language, content, symbol_name);
            if let Some(payload) = self.probe(&self.parser, &self.parser_count, &key) {
                self.total_requests.fetch_add(1, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.parser_hits.fetch_add(1, Ordering::Relaxed);
                return Some(payload);
            }
        }
        self.get(Some(content), file_id, symbol_name)
    }

    fn make_entry(&self, payload: V, key_hash: &str, symbol_name: &str, file_id: FileId) -> Arc<CacheEntry<V>> {
        Arc::new(CacheEntry {
            payload,
            cached_at_ns: monotonic_ns(),
            access_count: AtomicU64::new(0),
            key_hash: key_hash.to_string(),
            symbol_name: symbol_name.to_string(),
            file_id: file_id.value(),
        })
    }

    fn store(
        &self,
        map: &DashMap<String, Arc<CacheEntry<V>>>,
        count: &AtomicU64,
        cap: usize,
        key: String,
        entry: Arc<CacheEntry<V>>,
    ) {
        let fresh_key = map.insert(key, entry).is_none();
        if fresh_key && count.fetch_add(1, Ordering::Relaxed) + 1 > cap as u64 {
            self.evict_approx_oldest(map, count);
        }
    }

    /// Scan for the smallest `cached_at_ns` and drop it. Unlocked by
    /// design; a concurrent eviction pair removing two entries keeps the
    /// bound approximate rather than exact.
    fn evict_approx_oldest(&self, map: &DashMap<String, Arc<CacheEntry<V>>>, count: &AtomicU64) {
        let mut oldest: Option<(String, u64)> = None;
        for entry in map.iter() {
            let at = entry.value().cached_at_ns;
            match &oldest {
                Some((_, best)) if at >= *best => {}
                _ => oldest = Some((entry.key().clone(), at)),
            }
        }
        if let Some((key, _)) = oldest {
            if map.remove(&key).is_some() {
                count.fetch_sub(1, Ordering::Relaxed);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Store in every applicable namespace.
    pub fn put(&self, content: Option<&[u8]>, file_id: FileId, symbol_name: &str, payload: V) {
        if self.config.enable_content {
            if let Some(content) = content {
                let key = Self::content_key(content, symbol_name);
                let entry = self.make_entry(payload.clone(), &key, symbol_name, file_id);
                self.store(
                    &self.content,
                    &self.content_count,
                    self.config.max_content_entries,
                    key,
                    entry,
                );
            }
        }
        if self.config.enable_symbol {
            let key = Self::symbol_key(file_id, symbol_name);
            let entry = self.make_entry(payload, &key, symbol_name, file_id);
            self.store(
                &self.symbol,
                &self.symbol_count,
                self.config.max_symbol_entries,
                key,
                entry,
            );
        }
    }

    pub fn put_with_language(
        &self,
        language: &str,
        content: &[u8],
        file_id: FileId,
        symbol_name: &str,
        payload: V,
    ) {
        if self.config.enable_parser {
            let key = Self::parser_key(language, content, symbol_name);
            let entry = self.make_entry(payload.clone(), &key, symbol_name, file_id);
            self.store(
                &self.parser,
                &self.parser_count,
                self.config.max_parser_entries,
                key,
                entry,
            );
        }
        self.put(Some(content), file_id, symbol_name, payload);
    }

    /// Sweep all namespaces, dropping entries older than TTL. Counters
    /// reset to the post-sweep population.
    pub fn clean_expired(&self) {
        let ttl = self.ttl_ns.load(Ordering::Relaxed);
        let now = monotonic_ns();
        for (map, count) in [
            (&self.content, &self.content_count),
            (&self.symbol, &self.symbol_count),
            (&self.parser, &self.parser_count),
        ] {
            map.retain(|_, entry| now.saturating_sub(entry.cached_at_ns) <= ttl);
            count.store(map.len() as u64, Ordering::Relaxed);
        }
        *self.last_cleanup.lock() = Utc::now();
    }

    /// Drop all entries and zero all statistics.
    pub fn clear(&self) {
        self.content.clear();
        self.symbol.clear();
        self.parser.clear();
        for counter in [
            &self.hits,
            &self.misses,
            &self.evictions,
            &self.total_requests,
            &self.parser_hits,
            &self.parser_requests,
            &self.content_count,
            &self.symbol_count,
            &self.parser_count,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Atomically replace the TTL, then sweep under the new value.
    pub fn update_ttl(&self, new_ttl: Duration) {
        self.ttl_ns
            .store(new_ttl.as_nanos() as u64, Ordering::Relaxed);
        self.clean_expired();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let parser_hits = self.parser_hits.load(Ordering::Relaxed);
        let parser_requests = self.parser_requests.load(Ordering::Relaxed);
        let content_entries = self.content.len();
        let symbol_entries = self.symbol.len();
        let parser_entries = self.parser.len();
        let total_entries = content_entries + symbol_entries + parser_entries;

        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            total_requests,
            hit_rate: if total_requests > 0 {
                hits as f64 / total_requests as f64
            } else {
                0.0
            },
            content_entries,
            symbol_entries,
            parser_entries,
            total_entries,
            created_at: self.created_at,
            last_cleanup: *self.last_cleanup.lock(),
            uptime: Duration::from_nanos(monotonic_ns().saturating_sub(self.started_ns)),
            parser_hits,
            parser_hit_rate: if parser_requests > 0 {
                parser_hits as f64 / parser_requests as f64
            } else {
                0.0
            },
            estimated_memory_kb: total_entries as u64 * BYTES_PER_ENTRY / 1024,
        }
    }

    pub fn info(&self) -> CacheInfo {
        let stats = self.stats();
        let health = health_tag(stats.hit_rate);
        CacheInfo {
            max_entries: self.config.max_content_entries
                + self.config.max_symbol_entries
                + self.config.max_parser_entries,
            ttl: Duration::from_nanos(self.ttl_ns.load(Ordering::Relaxed)),
            enable_content: self.config.enable_content,
            enable_symbol: self.config.enable_symbol,
            health,
            stats,
        }
    }

    /// Access count recorded for a symbol-cache key, for diagnostics.
    pub fn symbol_access_count(&self, file_id: FileId, symbol_name: &str) -> u64 {
        self.symbol
            .get(&Self::symbol_key(file_id, symbol_name))
            .map(|entry| entry.access_count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Diagnostic view of a symbol-cache entry's identity fields.
    pub fn symbol_entry_identity(
        &self,
        file_id: FileId,
        symbol_name: &str,
    ) -> Option<(String, String, u32)> {
        self.symbol
            .get(&Self::symbol_key(file_id, symbol_name))
            .map(|entry| {
                (
                    entry.key_hash.clone(),
                    entry.symbol_name.clone(),
                    entry.file_id,
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn file(id: u32) -> FileId {
        FileId::new(id).unwrap()
    }

    fn small_cache(ttl: Duration) -> Arc<MetricsCache<String>> {
        MetricsCache::new(CacheConfig {
            ttl,
            max_content_entries: 4,
            max_symbol_entries: 4,
            max_parser_entries: 4,
            ..CacheConfig::default()
        })
    }

    #[test]
    fn test_put_get_round_trip() {
        let cache = small_cache(Duration::from_secs(60));
        cache.put(Some(b"content"), file(1), "f", "metrics".to_string());

        assert_eq!(
            cache.get(Some(b"content"), file(1), "f"),
            Some("metrics".to_string())
        );
        // Symbol namespace answers without content too.
        assert_eq!(cache.get(None, file(1), "f"), Some("metrics".to_string()));
        assert_eq!(cache.get(None, file(2), "f"), None);

        let stats = cache.stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_ttl_expiry_lazy_delete() {
        let cache = small_cache(Duration::from_millis(50));
        cache.put(Some(b"x"), file(1), "f", "v".to_string());
        assert!(cache.get(Some(b"x"), file(1), "f").is_some());

        thread::sleep(Duration::from_millis(60));
        assert!(cache.get(Some(b"x"), file(1), "f").is_none());

        let stats = cache.stats();
        assert_eq!(stats.total_requests, 2);
        assert!(stats.misses >= 1);
        // Lazy deletion removed both stale entries on read.
        assert_eq!(stats.content_entries, 0);
        assert_eq!(stats.symbol_entries, 0);
    }

    #[test]
    fn test_eviction_keeps_count_near_cap() {
        let cache = small_cache(Duration::from_secs(60));
        for i in 0..20u32 {
            // Distinct files so every symbol key is fresh.
            cache.put(None, file(i + 1), "sym", format!("v{i}"));
        }
        let stats = cache.stats();
        assert!(stats.symbol_entries <= 5, "entries: {}", stats.symbol_entries);
        assert!(stats.evictions >= 15);
    }

    #[test]
    fn test_eviction_removes_oldest_first() {
        let cache = small_cache(Duration::from_secs(60));
        for i in 0..5u32 {
            cache.put(None, file(i + 1), "sym", format!("v{i}"));
            thread::sleep(Duration::from_millis(2));
        }
        // The first insert is the approximate-oldest and must be gone.
        assert!(cache.get(None, file(1), "sym").is_none());
        assert!(cache.get(None, file(5), "sym").is_some());
    }

    #[test]
    fn test_parser_namespace_and_hit_rate() {
        let cache = small_cache(Duration::from_secs(60));
        cache.put_with_language("go", b"package main", file(1), "f", "v".to_string());

        assert_eq!(
            cache.get_with_language("go", b"package main", file(1), "f"),
            Some("v".to_string())
        );
        let stats = cache.stats();
        assert_eq!(stats.parser_hits, 1);
        assert!(stats.parser_hit_rate > 0.99);
        assert!(stats.parser_entries >= 1);
    }

    #[test]
    fn test_update_ttl_sweeps() {
        let cache = small_cache(Duration::from_secs(60));
        cache.put(None, file(1), "f", "v".to_string());
        thread::sleep(Duration::from_millis(10));

        cache.update_ttl(Duration::from_millis(1));
        assert_eq!(cache.stats().symbol_entries, 0);
    }

    #[test]
    fn test_clear_zeros_stats() {
        let cache = small_cache(Duration::from_secs(60));
        cache.put(None, file(1), "f", "v".to_string());
        cache.get(None, file(1), "f");
        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_hit_rate_and_health() {
        assert_eq!(health_tag(0.99), "excellent");
        assert_eq!(health_tag(0.9), "good");
        assert_eq!(health_tag(0.75), "fair");
        assert_eq!(health_tag(0.1), "poor");

        let cache = small_cache(Duration::from_secs(60));
        let info = cache.info();
        assert_eq!(info.max_entries, 12);
        assert_eq!(info.health, "poor");
    }

    #[test]
    fn test_estimated_memory_constant() {
        let cache = small_cache(Duration::from_secs(60));
        for i in 0..4u32 {
            cache.put(None, file(i + 1), "sym", "v".to_string());
        }
        let stats = cache.stats();
        assert_eq!(
            stats.estimated_memory_kb,
            stats.total_entries as u64 * 322 / 1024
        );
    }

    #[test]
    fn test_concurrent_access() {
        let cache = small_cache(Duration::from_secs(60));
        let mut handles = Vec::new();
        for t in 0..4u32 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..50u32 {
                    let id = file(t * 50 + i + 1);
                    cache.put(None, id, "s", format!("{t}:{i}"));
                    cache.get(None, id, "s");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = cache.stats();
        assert_eq!(stats.total_requests, 200);
        assert!(stats.symbol_entries <= 6);
    }

    #[tokio::test]
    async fn test_auto_cleanup_task() {
        let cache: Arc<MetricsCache<String>> = MetricsCache::new(CacheConfig {
            ttl: Duration::from_millis(20),
            auto_cleanup: true,
            cleanup_interval: Duration::from_millis(30),
            ..CacheConfig::default()
        });
        let handle = cache.start_auto_cleanup().expect("configured on");

        cache.put(None, file(1), "f", "v".to_string());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.stats().symbol_entries, 0);

        drop(cache);
        // The weak handle lets the task finish once the cache is gone.
        let _ = tokio::time::timeout(Duration::from_millis(200), handle).await;
    }
}
