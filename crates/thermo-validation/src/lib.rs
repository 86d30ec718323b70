//! thermo-validation: contraste continuo del puente contra valores publicados.
//!
//! Cada corrida calcula la velocidad CJ de los benchmarks por la ruta completa
//! del puente, la compara con la referencia dentro de la tolerancia de cada
//! caso y deja la última métrica por benchmark en un historial acotado.
pub mod benchmark;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;

pub use benchmark::{load_benchmarks, standard_benchmarks, ValidationBenchmark, DEFAULT_TOLERANCE};
pub use engine::{CjSpeedSource, ValidationEngine};
pub use error::ValidationError;
pub use metrics::{within_tolerance, AccuracyHistory, AccuracyMetric, MAX_ACCURACY_HISTORY};
pub use report::{save_report, BenchmarkFailure, ValidationReport};
