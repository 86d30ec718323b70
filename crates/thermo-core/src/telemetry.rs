//! Telemetría y registro de errores del puente.
//!
//! Un `Telemetry` pertenece a una instancia de puente; no hay estado global,
//! así que dos puentes (por ejemplo en tests) no interfieren entre sí. Todo el
//! estado vive detrás de un único `Mutex`.
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::constants::RECENT_ERRORS_CAPACITY;
use crate::errors::ErrorKind;

/// Latencias acumuladas de llamadas completadas (exitosas o fallidas medidas).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_executions: u64,
    pub total_ms: f64,
    pub average_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub last_execution: Option<DateTime<Utc>>,
}

impl PerformanceMetrics {
    pub fn record(&mut self, duration_ms: f64) {
        if self.total_executions == 0 || duration_ms < self.min_ms {
            self.min_ms = duration_ms;
        }
        if duration_ms > self.max_ms {
            self.max_ms = duration_ms;
        }
        self.total_executions += 1;
        self.total_ms += duration_ms;
        self.average_ms = self.total_ms / self.total_executions as f64;
        self.last_execution = Some(Utc::now());
    }
}

/// Copia de los contadores en un instante dado.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub retry_attempts: u64,
    pub timeout_failures: u64,
    pub validation_failures: u64,
    pub error_counts: BTreeMap<String, u64>,
    pub recent_errors: VecDeque<String>,
    pub performance: PerformanceMetrics,
}

impl Stats {
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.successful_calls as f64 / self.total_calls as f64
        }
    }
}

#[derive(Debug)]
pub struct Telemetry {
    ring_capacity: usize,
    inner: Mutex<Stats>,
}

impl Default for Telemetry {
    fn default() -> Self { Self::new() }
}

impl Telemetry {
    pub fn new() -> Self { Self::with_ring_capacity(RECENT_ERRORS_CAPACITY) }

    pub fn with_ring_capacity(ring_capacity: usize) -> Self {
        Self { ring_capacity: ring_capacity.max(1),
               inner: Mutex::new(Stats::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, Stats> {
        // los contadores siguen siendo consistentes aunque un hilo haya hecho panic
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_call(&self) { self.lock().total_calls += 1; }

    pub fn record_calls(&self, n: u64) { self.lock().total_calls += n; }

    pub fn record_success(&self) { self.lock().successful_calls += 1; }

    pub fn record_successes(&self, n: u64) { self.lock().successful_calls += n; }

    pub fn record_retry(&self) { self.lock().retry_attempts += 1; }

    /// Registra un fallo terminal por categoría y lo agrega al anillo.
    pub fn record_error(&self, kind: ErrorKind, message: &str) { self.record_failed_calls(kind, message, 1); }

    /// Un único error que hace fallar `calls` llamadas (p. ej. un lote completo).
    pub fn record_failed_calls(&self, kind: ErrorKind, message: &str, calls: u64) {
        let category = kind.as_str();
        error!("[{category}] {message}");
        let mut stats = self.lock();
        stats.failed_calls += calls;
        match kind {
            ErrorKind::TimeoutError => stats.timeout_failures += 1,
            ErrorKind::InvalidInput => stats.validation_failures += 1,
            _ => {}
        }
        *stats.error_counts.entry(category.to_string()).or_insert(0) += 1;
        if stats.recent_errors.len() == self.ring_capacity {
            stats.recent_errors.pop_front();
        }
        stats.recent_errors.push_back(format!("[{category}] {message}"));
    }

    pub fn record_latency(&self, duration_ms: f64) { self.lock().performance.record(duration_ms); }

    pub fn total_calls(&self) -> u64 { self.lock().total_calls }
    pub fn successful_calls(&self) -> u64 { self.lock().successful_calls }
    pub fn failed_calls(&self) -> u64 { self.lock().failed_calls }
    pub fn retry_attempts(&self) -> u64 { self.lock().retry_attempts }
    pub fn timeout_failures(&self) -> u64 { self.lock().timeout_failures }
    pub fn validation_failures(&self) -> u64 { self.lock().validation_failures }
    pub fn error_counts(&self) -> BTreeMap<String, u64> { self.lock().error_counts.clone() }
    pub fn recent_errors(&self) -> Vec<String> { self.lock().recent_errors.iter().cloned().collect() }
    pub fn success_rate(&self) -> f64 { self.lock().success_rate() }
    pub fn performance(&self) -> PerformanceMetrics { self.lock().performance.clone() }

    /// Restaura métricas de rendimiento (p. ej. desde un snapshot de caché).
    pub fn restore_performance(&self, metrics: PerformanceMetrics) { self.lock().performance = metrics; }

    pub fn reset_performance(&self) { self.lock().performance = PerformanceMetrics::default(); }

    pub fn snapshot(&self) -> Stats { self.lock().clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_and_counters() {
        let t = Telemetry::new();
        assert_eq!(t.success_rate(), 0.0);
        t.record_call();
        t.record_success();
        t.record_call();
        t.record_error(ErrorKind::TimeoutError, "slow");
        assert_eq!(t.total_calls(), 2);
        assert_eq!(t.failed_calls(), 1);
        assert_eq!(t.timeout_failures(), 1);
        assert!((t.success_rate() - 0.5).abs() < 1e-12);
        assert_eq!(t.error_counts().get("TimeoutError"), Some(&1));
    }

    #[test]
    fn recent_errors_ring_overwrites_oldest() {
        let t = Telemetry::new();
        for i in 0..15 {
            t.record_error(ErrorKind::ProcessError, &format!("e{i}"));
        }
        let recent = t.recent_errors();
        assert_eq!(recent.len(), RECENT_ERRORS_CAPACITY);
        assert_eq!(recent.first().map(String::as_str), Some("[ProcessError] e5"));
        assert_eq!(recent.last().map(String::as_str), Some("[ProcessError] e14"));
        assert_eq!(t.error_counts().get("ProcessError"), Some(&15));
    }

    #[test]
    fn latency_min_max_average() {
        let t = Telemetry::new();
        t.record_latency(10.0);
        t.record_latency(30.0);
        t.record_latency(20.0);
        let p = t.performance();
        assert_eq!(p.total_executions, 3);
        assert_eq!(p.min_ms, 10.0);
        assert_eq!(p.max_ms, 30.0);
        assert!((p.average_ms - 20.0).abs() < 1e-12);
        assert!(p.last_execution.is_some());
        t.reset_performance();
        assert_eq!(t.performance().total_executions, 0);
    }

    #[test]
    fn instances_do_not_share_state() {
        let a = Telemetry::new();
        let b = Telemetry::new();
        a.record_retry();
        assert_eq!(a.retry_attempts(), 1);
        assert_eq!(b.retry_attempts(), 0);
    }
}
