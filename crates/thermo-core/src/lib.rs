//! thermo-core: piezas compartidas del puente de cómputo externo.
//!
//! - `errors`: taxonomía de errores del puente y política de reintento.
//! - `hashing`: JSON canónico y hash hex (blake3).
//! - `cache`: caché LRU acotada con snapshot a disco.
//! - `telemetry`: contadores, latencias y anillo de errores recientes.
pub mod cache;
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod telemetry;

pub use cache::{cache_key, CacheError, CacheSnapshot, CacheStats, CachedResult, ResultCache};
pub use errors::{is_retryable, BridgeError, BridgeResult, ErrorKind};
pub use telemetry::{PerformanceMetrics, Stats, Telemetry};
