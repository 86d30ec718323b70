//! ThermoFlow Rust Library
//!
//! Fachada del workspace:
//! - `config`: configuración global (`CONFIG`) leída del entorno.
//! - `errors`: errores de aplicación que agrupan los de cada crate.
//! - `hashing`: JSON canónico y hashes estables.
//!
//! Los crates `thermo-*` se re-exportan para que los binarios dependan de uno solo.

pub mod config;
pub mod errors;
pub mod hashing;

pub use thermo_core as bridge_core;
pub use thermo_domain as domain;
pub use thermo_engine as engine;
pub use thermo_validation as validation;
