// Reexport de la implementación única ubicada en `thermo-core` para evitar
// duplicación de lógica de canonicalización/hashing a nivel de workspace.
pub use thermo_core::hashing::{hash_str, hash_value, to_canonical_json};
