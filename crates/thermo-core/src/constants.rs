//! Constantes del puente.
//!
//! `CACHE_FORMAT_VERSION` forma parte del snapshot de caché: si el formato de
//! salida del toolkit cambia, subir esta versión invalida los snapshots
//! existentes al cargarlos.

/// Versión del protocolo JSON hablado con el toolkit.
pub const PROTOCOL_VERSION: &str = "1.0";

pub const CACHE_FORMAT_VERSION: u32 = 1;

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Decimales usados al redondear presión y temperatura en la clave de caché.
pub const CACHE_KEY_PRECISION: usize = 6;

pub const RECENT_ERRORS_CAPACITY: usize = 10;
