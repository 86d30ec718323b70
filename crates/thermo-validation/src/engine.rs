use log::{info, warn};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use uuid::Uuid;

use thermo_core::hashing::hash_value;
use thermo_core::{BridgeError, BridgeResult};
use thermo_domain::InitialConditions;
use thermo_engine::{BridgeConfig, Invoke, ThermoBridge};

use crate::benchmark::{load_benchmarks, standard_benchmarks, ValidationBenchmark};
use crate::metrics::{AccuracyHistory, AccuracyMetric};
use crate::report::{BenchmarkFailure, ValidationReport};
use crate::ValidationError;

/// Por debajo de este porcentaje se avisa en el log aunque la corrida termine.
const LOW_ACCURACY_WARNING: f64 = 90.0;

/// Fuente de velocidades CJ. La validación recorre la ruta completa del
/// puente (límites, caché, reintentos) a través de este contrato.
pub trait CjSpeedSource {
    fn cj_speed(&self, conditions: &InitialConditions) -> BridgeResult<f64>;
}

impl<I: Invoke> CjSpeedSource for ThermoBridge<I> {
    fn cj_speed(&self, conditions: &InitialConditions) -> BridgeResult<f64> { self.calculate_cj_speed(conditions) }
}

pub struct ValidationEngine {
    enabled: bool,
    benchmarks: Vec<ValidationBenchmark>,
    history: Mutex<AccuracyHistory>,
}

impl ValidationEngine {
    /// Motor con los benchmarks estándar.
    pub fn new(enabled: bool) -> Self { Self::with_benchmarks(enabled, standard_benchmarks()) }

    pub fn with_benchmarks(enabled: bool, benchmarks: Vec<ValidationBenchmark>) -> Self {
        Self { enabled,
               benchmarks,
               history: Mutex::new(AccuracyHistory::default()) }
    }

    pub fn from_config(config: &BridgeConfig) -> Self { Self::new(config.validation_enabled) }

    pub fn is_enabled(&self) -> bool { self.enabled }

    pub fn set_enabled(&mut self, enabled: bool) { self.enabled = enabled; }

    pub fn benchmarks(&self) -> &[ValidationBenchmark] { &self.benchmarks }

    pub fn add_benchmark(&mut self, benchmark: ValidationBenchmark) { self.benchmarks.push(benchmark); }

    /// Reemplaza los benchmarks por los del archivo.
    pub fn load_benchmarks(&mut self, path: &Path) -> Result<usize, ValidationError> {
        self.benchmarks = load_benchmarks(path)?;
        Ok(self.benchmarks.len())
    }

    fn history(&self) -> MutexGuard<'_, AccuracyHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn run<S: CjSpeedSource + ?Sized>(&self, source: &S) -> Result<ValidationReport, ValidationError> {
        self.run_benchmarks(source, &self.benchmarks)
    }

    pub fn run_single<S: CjSpeedSource + ?Sized>(&self, source: &S, name: &str) -> Result<ValidationReport, ValidationError> {
        let benchmark = self.benchmarks
                            .iter()
                            .find(|b| b.name == name)
                            .ok_or_else(|| ValidationError::BenchmarkNotFound(name.to_string()))?;
        self.run_benchmarks(source, std::slice::from_ref(benchmark))
    }

    /// Ejecuta cada benchmark; un error cuenta como fallo y la corrida sigue.
    pub fn run_benchmarks<S: CjSpeedSource + ?Sized>(&self,
                                                      source: &S,
                                                      benchmarks: &[ValidationBenchmark])
                                                      -> Result<ValidationReport, ValidationError> {
        if !self.enabled {
            return Err(ValidationError::Disabled);
        }
        let run_id = Uuid::new_v4();
        info!("validation run {run_id}: {} benchmarks", benchmarks.len());
        let mut results = Vec::new();
        let mut failures = Vec::new();
        for benchmark in benchmarks {
            let start = Instant::now();
            let outcome = InitialConditions::new(benchmark.pressure,
                                                 benchmark.temperature,
                                                 &benchmark.composition,
                                                 &benchmark.mechanism).map_err(BridgeError::from)
                                                                      .and_then(|c| source.cj_speed(&c));
            let calculated = match outcome {
                Ok(v) => v,
                Err(e) => {
                    warn!("benchmark {} failed: {e}", benchmark.name);
                    failures.push(BenchmarkFailure { benchmark: benchmark.name.clone(),
                                                     message: e.to_string() });
                    continue;
                }
            };
            let metric = AccuracyMetric::evaluate(&benchmark.name,
                                                  calculated,
                                                  benchmark.expected_value,
                                                  benchmark.tolerance,
                                                  start.elapsed().as_secs_f64() * 1000.0);
            if metric.passed {
                info!("✓ {}: {calculated} m/s (error {:.2}%)", benchmark.name, metric.relative_error * 100.0);
            } else {
                warn!("✗ {}: {calculated} m/s, expected {} m/s (error {:.2}%, tolerance {:.2}%)",
                      benchmark.name,
                      benchmark.expected_value,
                      metric.relative_error * 100.0,
                      benchmark.tolerance * 100.0);
            }
            self.history().record(metric.clone());
            results.push(metric);
        }

        let total = benchmarks.len();
        let passed = results.iter().filter(|m| m.passed).count();
        let overall_accuracy = if total > 0 { passed as f64 / total as f64 * 100.0 } else { 0.0 };
        let mean_relative_error = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|m| m.relative_error).sum::<f64>() / results.len() as f64
        };
        let set = serde_json::to_value(benchmarks).unwrap_or(Value::Null);
        let report = ValidationReport { run_id,
                                        benchmark_set_hash: hash_value(&set),
                                        total,
                                        passed,
                                        failed: total - passed,
                                        overall_accuracy,
                                        mean_relative_error,
                                        results,
                                        failures,
                                        report_time: chrono::Utc::now() };
        if overall_accuracy < LOW_ACCURACY_WARNING {
            warn!("validation run {run_id}: {passed}/{total} passed ({overall_accuracy:.1}%)");
        } else {
            info!("validation run {run_id}: {passed}/{total} passed ({overall_accuracy:.1}%)");
        }
        Ok(report)
    }

    pub fn last_metric(&self, benchmark: &str) -> Option<AccuracyMetric> { self.history().get(benchmark).cloned() }

    /// Fracción de benchmarks del historial que pasaron en su última corrida.
    pub fn current_accuracy_score(&self) -> f64 { self.history().score() }
}
