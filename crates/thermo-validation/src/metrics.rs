use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Capacidad del historial de precisión.
pub const MAX_ACCURACY_HISTORY: usize = 100;

/// Resultado de un benchmark en una corrida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetric {
    pub benchmark: String,
    pub calculated_value: f64,
    pub expected_value: f64,
    pub absolute_error: f64,
    /// Fracción, no porcentaje.
    pub relative_error: f64,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
    pub execution_ms: f64,
}

impl AccuracyMetric {
    pub fn evaluate(benchmark: &str, calculated: f64, expected: f64, tolerance: f64, execution_ms: f64) -> Self {
        let absolute_error = (calculated - expected).abs();
        // con referencia nula el error relativo no existe; se usa el absoluto
        let relative_error = if expected == 0.0 { absolute_error } else { absolute_error / expected.abs() };
        Self { benchmark: benchmark.to_string(),
               calculated_value: calculated,
               expected_value: expected,
               absolute_error,
               relative_error,
               passed: within_tolerance(calculated, expected, tolerance),
               timestamp: Utc::now(),
               execution_ms }
    }
}

/// `|calc - exp| / |exp| <= tol`; con `exp == 0`, `|calc| <= tol`.
pub fn within_tolerance(calculated: f64, expected: f64, tolerance: f64) -> bool {
    if !calculated.is_finite() {
        return false;
    }
    if expected == 0.0 {
        return calculated.abs() <= tolerance;
    }
    ((calculated - expected) / expected).abs() <= tolerance
}

/// Última métrica por benchmark. Re-registrar un nombre lo mueve al final;
/// pasada la capacidad se descarta el registrado hace más tiempo.
#[derive(Debug, Clone)]
pub struct AccuracyHistory {
    capacity: usize,
    entries: IndexMap<String, AccuracyMetric>,
}

impl Default for AccuracyHistory {
    fn default() -> Self { Self::new(MAX_ACCURACY_HISTORY) }
}

impl AccuracyHistory {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1),
               entries: IndexMap::new() }
    }

    pub fn record(&mut self, metric: AccuracyMetric) {
        self.entries.shift_remove(&metric.benchmark);
        self.entries.insert(metric.benchmark.clone(), metric);
        while self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    pub fn get(&self, benchmark: &str) -> Option<&AccuracyMetric> { self.entries.get(benchmark) }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Fracción de benchmarks del historial que pasaron; 0 si está vacío.
    pub fn score(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let passed = self.entries.values().filter(|m| m.passed).count();
        passed as f64 / self.entries.len() as f64
    }
}
