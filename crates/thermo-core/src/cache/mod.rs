//! Caché LRU de resultados del toolkit, con snapshot/restauración a disco.
mod key;
mod lru;
mod store;

pub use key::cache_key;
pub use lru::RecencyIndex;
pub use store::{CacheError, CacheSnapshot, CacheStats, CachedResult, ResultCache};
