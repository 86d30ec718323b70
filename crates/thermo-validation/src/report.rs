use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::{AccuracyMetric, ValidationError};

/// Benchmark que no llegó a producir métrica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkFailure {
    pub benchmark: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub run_id: Uuid,
    /// Hash del conjunto de benchmarks evaluado; dos reportes son comparables
    /// sólo si coincide.
    pub benchmark_set_hash: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Porcentaje.
    pub overall_accuracy: f64,
    /// Fracción media sobre los benchmarks ejecutados.
    pub mean_relative_error: f64,
    pub results: Vec<AccuracyMetric>,
    pub failures: Vec<BenchmarkFailure>,
    pub report_time: DateTime<Utc>,
}

impl ValidationReport {
    pub fn all_passed(&self) -> bool { self.total > 0 && self.passed == self.total }
}

pub fn save_report(report: &ValidationReport, path: &Path) -> Result<(), ValidationError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    debug!("validation report saved to {}", path.display());
    Ok(())
}
