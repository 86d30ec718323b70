use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use super::lru::RecencyIndex;
use crate::constants::{CACHE_FORMAT_VERSION, DEFAULT_CACHE_CAPACITY};
use crate::telemetry::PerformanceMetrics;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Resultado almacenado junto con su metadato de uso.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub value: Value,
    pub key: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub access_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStatistics {
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Formato persistido. `cache` va ordenado de menos a más reciente para que
/// la restauración reconstruya el mismo orden de desalojo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub version: u32,
    pub cache: IndexMap<String, CachedResult>,
    pub statistics: SnapshotStatistics,
    #[serde(default)]
    pub performance: PerformanceMetrics,
}

#[derive(Debug)]
struct Slot {
    entry: CachedResult,
    node: usize,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, Slot>,
    order: RecencyIndex,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheInner {
    fn insert(&mut self, capacity: usize, key: String, entry: CachedResult) {
        if let Some(slot) = self.entries.get_mut(&key) {
            slot.entry = entry;
            let node = slot.node;
            self.order.touch(node);
            return;
        }
        while self.entries.len() >= capacity {
            match self.order.pop_back() {
                Some(old) => {
                    debug!("cache evict {old}");
                    self.entries.remove(&old);
                    self.evictions += 1;
                }
                None => break,
            }
        }
        let node = self.order.push_front(key.clone());
        self.entries.insert(key, Slot { entry, node });
    }
}

/// Caché LRU acotada. Todas las operaciones toman el mismo lock, así que la
/// caché se puede compartir entre hilos sin coordinación externa.
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl Default for ResultCache {
    fn default() -> Self { Self::new(DEFAULT_CACHE_CAPACITY) }
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1),
               inner: Mutex::new(CacheInner::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize { self.capacity }

    /// Busca `key`; en acierto promueve la entrada y cuenta el acceso.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.lock();
        let found = inner.entries.get_mut(key).map(|slot| {
            slot.entry.access_count = slot.entry.access_count.saturating_add(1);
            (slot.node, slot.entry.value.clone())
        });
        match found {
            Some((node, value)) => {
                inner.order.touch(node);
                inner.hits += 1;
                Some(value)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Como `get` pero sin tocar contadores ni orden.
    pub fn peek(&self, key: &str) -> Option<CachedResult> {
        self.lock().entries.get(key).map(|s| s.entry.clone())
    }

    pub fn put(&self, key: &str, value: Value) {
        let entry = CachedResult { value,
                                   key: key.to_string(),
                                   created_at: Utc::now(),
                                   access_count: 0 };
        self.lock().insert(self.capacity, key.to_string(), entry);
    }

    pub fn remove(&self, key: &str) -> Option<CachedResult> {
        let mut inner = self.lock();
        let slot = inner.entries.remove(key)?;
        inner.order.remove(slot.node);
        Some(slot.entry)
    }

    /// Vacía entradas y contadores.
    pub fn clear(&self) { *self.lock() = CacheInner::default(); }

    pub fn len(&self) -> usize { self.lock().entries.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats { entries: inner.entries.len(),
                     capacity: self.capacity,
                     hits: inner.hits,
                     misses: inner.misses,
                     evictions: inner.evictions }
    }

    pub fn snapshot(&self, performance: PerformanceMetrics) -> CacheSnapshot {
        let inner = self.lock();
        let cache = inner.order
                         .iter_lru()
                         .filter_map(|k| inner.entries.get(k).map(|s| (k.to_string(), s.entry.clone())))
                         .collect();
        CacheSnapshot { version: CACHE_FORMAT_VERSION,
                        cache,
                        statistics: SnapshotStatistics { cache_hits: inner.hits,
                                                         cache_misses: inner.misses },
                        performance }
    }

    /// Reemplaza el contenido por el del snapshot. Si trae más entradas que la
    /// capacidad se quedan las más recientes.
    pub fn restore(&self, snapshot: CacheSnapshot) {
        let mut inner = CacheInner { hits: snapshot.statistics.cache_hits,
                                     misses: snapshot.statistics.cache_misses,
                                     ..CacheInner::default() };
        let skip = snapshot.cache.len().saturating_sub(self.capacity);
        for (key, entry) in snapshot.cache.into_iter().skip(skip) {
            inner.insert(self.capacity, key, entry);
        }
        *self.lock() = inner;
    }

    /// Escribe el snapshot de forma atómica (archivo temporal + rename).
    pub fn save_to_file(&self, path: &Path, performance: PerformanceMetrics) -> Result<(), CacheError> {
        let snapshot = self.snapshot(performance);
        let body = serde_json::to_string_pretty(&snapshot)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, path)?;
        debug!("cache saved to {} ({} entries)", path.display(), snapshot.cache.len());
        Ok(())
    }

    /// Carga un snapshot previo. Devuelve las métricas de rendimiento guardadas,
    /// o `None` si no había archivo. Un archivo corrupto vacía la caché y se
    /// reporta como error; una versión desconocida se ignora.
    pub fn load_from_file(&self, path: &Path) -> Result<Option<PerformanceMetrics>, CacheError> {
        let body = match fs::read_to_string(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: CacheSnapshot = match serde_json::from_str(&body) {
            Ok(s) => s,
            Err(e) => {
                error!("corrupt cache file {}: {e}; starting empty", path.display());
                self.clear();
                return Err(e.into());
            }
        };
        if snapshot.version != CACHE_FORMAT_VERSION {
            warn!("cache file {} has format version {} (expected {}); ignoring",
                  path.display(),
                  snapshot.version,
                  CACHE_FORMAT_VERSION);
            return Ok(None);
        }
        let performance = snapshot.performance.clone();
        self.restore(snapshot);
        debug!("cache loaded from {} ({} entries)", path.display(), self.len());
        Ok(Some(performance))
    }
}
