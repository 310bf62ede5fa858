//! Render cache
//!
//! Rendered output is memoized under a key built from the cache namespace,
//! the template name and a [`Fingerprint`] of the data context. The storage
//! itself is behind the [`CacheStore`] trait; two stores ship with the crate:
//!
//! - [`MemoryStore`] - in-process, with TTL, a size bound and eviction
//! - [`FileSystemStore`] - one JSON file per entry in a cache directory
//!
//! Clearing everything is a single bulk operation on the store. Clearing one
//! template deletes every key starting with `"{namespace}_{template}_"`, which
//! is an approximation: it also removes entries of templates whose names
//! extend `template` with an underscore (`post` also clears `post_list`).

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::value::Context;

/// Cache entry with expiration support
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: Instant,
    pub expires_at: Option<Instant>,
    pub access_count: usize,
    pub last_accessed: Instant,
}

impl<T> CacheEntry<T> {
    /// Create a new cache entry with optional expiration
    pub fn new(value: T, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            // A TTL too large to represent never expires
            expires_at: ttl.and_then(|duration| now.checked_add(duration)),
            access_count: 0,
            last_accessed: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() >= expires_at,
            None => false,
        }
    }

    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
        self.last_accessed = Instant::now();
    }

    pub fn age(&self) -> Duration {
        Instant::now().duration_since(self.created_at)
    }
}

/// Cache eviction strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvictionStrategy {
    /// Least Recently Used
    LRU,
    /// Least Frequently Used
    LFU,
    /// First In, First Out
    FIFO,
}

/// Generic cache implementation with configurable eviction
pub struct Cache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    max_size: usize,
    default_ttl: Option<Duration>,
    eviction_strategy: EvictionStrategy,
    hits: usize,
    misses: usize,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(
        max_size: usize,
        default_ttl: Option<Duration>,
        eviction_strategy: EvictionStrategy,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            max_size,
            default_ttl,
            eviction_strategy,
            hits: 0,
            misses: 0,
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.insert_with_ttl(key, value, self.default_ttl)
    }

    pub fn insert_with_ttl(&mut self, key: K, value: V, ttl: Option<Duration>) -> Option<V> {
        self.cleanup_expired();

        if self.entries.len() >= self.max_size && !self.entries.contains_key(&key) {
            self.evict_one();
        }

        self.entries
            .insert(key, CacheEntry::new(value, ttl))
            .map(|old_entry| old_entry.value)
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get_mut(key) {
            if entry.is_expired() {
                self.entries.remove(key);
                self.misses += 1;
                None
            } else {
                entry.mark_accessed();
                self.hits += 1;
                Some(entry.value.clone())
            }
        } else {
            self.misses += 1;
            None
        }
    }

    /// Check if a key exists in the cache (without affecting access statistics)
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Remove every entry whose key matches the predicate, returning how many went
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&K) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            hit_rate: if self.hits + self.misses > 0 {
                self.hits as f64 / (self.hits + self.misses) as f64
            } else {
                0.0
            },
            entry_count: self.entries.len(),
            max_size: self.max_size,
        }
    }

    fn cleanup_expired(&mut self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }

    fn evict_one(&mut self) {
        let key_to_remove = match self.eviction_strategy {
            EvictionStrategy::LRU => self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(k, _)| k.clone()),
            EvictionStrategy::LFU => self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.access_count)
                .map(|(k, _)| k.clone()),
            EvictionStrategy::FIFO => self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(k, _)| k.clone()),
        };

        if let Some(key) = key_to_remove {
            self.entries.remove(&key);
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub hit_rate: f64,
    pub entry_count: usize,
    pub max_size: usize,
}

/// Key/value storage behind the render cache
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry; expired entries count as misses
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove every entry in one operation
    fn delete_all(&self) -> Result<bool>;

    /// Remove every entry whose key starts with `prefix`
    fn delete_by_prefix(&self, prefix: &str) -> Result<bool>;
}

/// In-process cache store
pub struct MemoryStore {
    cache: RwLock<Cache<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(1000, EvictionStrategy::LRU)
    }

    pub fn with_capacity(max_size: usize, eviction_strategy: EvictionStrategy) -> Self {
        Self {
            cache: RwLock::new(Cache::new(max_size, None, eviction_strategy)),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache
            .read()
            .map(|cache| cache.stats())
            .unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::cache_static("cache lock poisoned")
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut cache = self.cache.write().map_err(poisoned)?;
        Ok(cache.get(&key.to_string()))
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut cache = self.cache.write().map_err(poisoned)?;
        cache.insert_with_ttl(key.to_string(), value.to_string(), Some(ttl));
        Ok(())
    }

    fn delete_all(&self) -> Result<bool> {
        self.cache.write().map_err(poisoned)?.clear();
        Ok(true)
    }

    fn delete_by_prefix(&self, prefix: &str) -> Result<bool> {
        let mut cache = self.cache.write().map_err(poisoned)?;
        cache.remove_where(|key| key.starts_with(prefix));
        Ok(true)
    }
}

const ENTRY_EXTENSION: &str = "cache";

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    /// Milliseconds since the Unix epoch
    expires_at: u128,
    value: String,
}

/// Cache store keeping one JSON file per entry
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    dir: PathBuf,
}

impl FileSystemStore {
    /// Use `dir` as the cache directory, creating it if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", file_safe(key), ENTRY_EXTENSION))
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Map a key to a file name
///
/// Safe characters are kept and every other byte (including `%`) becomes
/// `%XX`. The mapping is injective and works character by character, so the
/// encoding of a prefix is a prefix of the encoded key.
fn file_safe(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for c in key.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
            name.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                name.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    name
}

impl CacheStore for FileSystemStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: StoredEntry = serde_json::from_str(&raw)?;
        if now_millis() >= entry.expires_at {
            // Expired entries are removed lazily; a concurrent delete is fine
            let _ = std::fs::remove_file(&path);
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = StoredEntry {
            expires_at: now_millis().saturating_add(ttl.as_millis()),
            value: value.to_string(),
        };
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn delete_all(&self) -> Result<bool> {
        for path in self.entry_files()? {
            std::fs::remove_file(path)?;
        }
        Ok(true)
    }

    fn delete_by_prefix(&self, prefix: &str) -> Result<bool> {
        let prefix = file_safe(prefix);
        for path in self.entry_files()? {
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix))
                .unwrap_or(false);
            if matches {
                std::fs::remove_file(path)?;
            }
        }
        Ok(true)
    }
}

/// Deterministic digest of a data context
///
/// Hex SHA-256 of the context's compact JSON form. Key order and array order
/// both matter, so equal data inserted in a different order may fingerprint
/// differently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(context: &Context) -> Result<Self> {
        Self::with_layout(context, None)
    }

    /// Fingerprint that also distinguishes the default layout a render used
    pub fn with_layout(context: &Context, layout: Option<&str>) -> Result<Self> {
        let mut hasher = Sha256::new();
        hasher.update(context.to_json_string()?.as_bytes());
        if let Some(layout) = layout {
            hasher.update(b"\0layout:");
            hasher.update(layout.as_bytes());
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Memoizes rendered output by template name and context fingerprint
pub struct RenderCache {
    store: Box<dyn CacheStore>,
    namespace: String,
    default_ttl: Duration,
}

impl RenderCache {
    pub fn new<S: Into<String>>(store: Box<dyn CacheStore>, namespace: S, default_ttl: Duration) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            default_ttl,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Cache key for a template and fingerprint
    pub fn key(&self, template: &str, fingerprint: &Fingerprint) -> String {
        sanitize_key(&format!(
            "{}_{}_{}",
            self.namespace,
            template,
            fingerprint.as_str()
        ))
    }

    /// Serve a stored render, or compute, store and return it
    ///
    /// `compute` runs only on a miss. Errors from `compute` are returned as-is
    /// and nothing is stored. Store failures are logged and otherwise ignored,
    /// so a broken cache degrades to rendering every time.
    pub fn get_or_render<F>(
        &self,
        template: &str,
        fingerprint: &Fingerprint,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        let key = self.key(template, fingerprint);

        match self.store.get(&key) {
            Ok(Some(output)) => {
                tracing::debug!(template, key = %key, "render cache hit");
                return Ok(output);
            }
            Ok(None) => tracing::debug!(template, key = %key, "render cache miss"),
            Err(e) => tracing::warn!(template, error = %e, "render cache read failed"),
        }

        let output = compute()?;
        let ttl = ttl.unwrap_or(self.default_ttl);
        match self.store.put(&key, &output, ttl) {
            Ok(()) => tracing::debug!(template, ttl_secs = ttl.as_secs(), "stored rendered output"),
            Err(e) => tracing::warn!(template, error = %e, "render cache write failed"),
        }
        Ok(output)
    }

    /// Clear one template's entries (approximate, by key prefix) or everything
    pub fn clear(&self, template: Option<&str>) -> Result<bool> {
        match template {
            None => self.store.delete_all(),
            Some(template) => {
                let prefix = sanitize_key(&format!("{}_{}_", self.namespace, template));
                self.store.delete_by_prefix(&prefix)
            }
        }
    }
}

fn sanitize_key(key: &str) -> String {
    key.replace(['{', '}', ':'], "_")
}
