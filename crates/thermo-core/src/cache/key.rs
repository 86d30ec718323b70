use thermo_domain::Composition;

use crate::constants::CACHE_KEY_PRECISION;
use crate::hashing::hash_str;

/// Clave determinista de una consulta. Dos composiciones equivalentes
/// (mismo contenido, distinto orden o espaciado) producen la misma clave.
pub fn cache_key(function: &str, pressure: f64, temperature: f64, composition: &Composition, mechanism: &str) -> String {
    let p = CACHE_KEY_PRECISION;
    hash_str(&format!("{function}_{pressure:.p$}_{temperature:.p$}_{}_{mechanism}", composition.normalized()))
}
