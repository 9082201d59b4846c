use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

// Bumped whenever the stored format or data source changes, to invalidate old entries
pub const CACHE_KEY_PREFIX: &str = "hsr_travel_times_v2_grounded_";

pub fn cache_key(center_city: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, center_city)
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cache lock poisoned")]
    Poisoned,
}

/// String key-value store backing the travel-time cache
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
}

/// In-process store, bounded to the most recently used entries
pub struct LruCacheStore {
    entries: Mutex<LruCache<String, String>>,
}

impl LruCacheStore {
    pub fn new(capacity: usize) -> Self {
        let cache_size = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cache_size)),
        }
    }
}

impl Default for LruCacheStore {
    fn default() -> Self {
        Self::new(100)
    }
}

impl CacheStore for LruCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut cache = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut cache = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        cache.put(key.to_string(), value);
        Ok(())
    }
}

/// One JSON file per key under a directory, surviving restarts
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys carry city names; keep them but drop anything that could escape the directory
        let file_name: String = key
            .chars()
            .map(|c| if c == '/' || c == '\\' || c == '.' { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn key_is_prefixed_city_name() {
        assert_eq!(cache_key("北京"), "hsr_travel_times_v2_grounded_北京");
    }

    #[test]
    fn lru_store_evicts_oldest() {
        let store = LruCacheStore::new(2);
        store.set("a", "1".into()).unwrap();
        store.set("b", "2".into()).unwrap();
        store.set("c", "3".into()).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("c").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn zero_capacity_still_stores_one_entry() {
        let store = LruCacheStore::new(0);
        store.set("a", "1".into()).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn file_store_round_trips_and_misses_cleanly() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("hsr_isochrone_cache_test_{suffix}"));
        let store = FileCacheStore::new(&dir);

        assert_eq!(store.get(&cache_key("上海")).unwrap(), None);
        store.set(&cache_key("上海"), "{\"上海\":0}".into()).unwrap();
        assert_eq!(
            store.get(&cache_key("上海")).unwrap().as_deref(),
            Some("{\"上海\":0}")
        );
        assert!(store.path_for("../x").starts_with(&dir));

        std::fs::remove_dir_all(dir).expect("cleanup");
    }
}
