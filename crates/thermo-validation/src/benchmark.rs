//! Casos de referencia con velocidad CJ publicada en la literatura.
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::ValidationError;

/// Tolerancia relativa por defecto (5 %).
pub const DEFAULT_TOLERANCE: f64 = 0.05;

fn default_tolerance() -> f64 { DEFAULT_TOLERANCE }

fn default_reference() -> String { "Unknown".to_string() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationBenchmark {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// [Pa]
    pub pressure: f64,
    /// [K]
    pub temperature: f64,
    pub composition: String,
    pub mechanism: String,
    /// Velocidad CJ esperada [m/s].
    #[serde(alias = "expectedCJSpeed", alias = "expected_cj_speed")]
    pub expected_value: f64,
    /// Error relativo admitido (fracción).
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_reference", alias = "citation")]
    pub reference: String,
}

impl ValidationBenchmark {
    fn check(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidBenchmark("benchmark name must not be empty".to_string()));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ValidationError::InvalidBenchmark(format!("{}: tolerance must be a non-negative number",
                                                                 self.name)));
        }
        if !self.expected_value.is_finite() {
            return Err(ValidationError::InvalidBenchmark(format!("{}: expected value must be finite", self.name)));
        }
        Ok(())
    }
}

/// Mezclas H2-aire con velocidades CJ de referencia.
pub fn standard_benchmarks() -> Vec<ValidationBenchmark> {
    vec![ValidationBenchmark { name: "H2_air_STP".to_string(),
                               description: "Stoichiometric H2-air at standard conditions".to_string(),
                               pressure: 101_325.0,
                               temperature: 300.0,
                               composition: "H2:2 O2:1 N2:3.76".to_string(),
                               mechanism: "sandiego20161214_H2only.yaml".to_string(),
                               expected_value: 1975.3,
                               tolerance: 0.03,
                               reference: "Shepherd, J.E. (2009). Detonation in gases. Proc. Combust. Inst., 32(1), 83-98".to_string() },
         ValidationBenchmark { name: "H2_air_rich".to_string(),
                               description: "Rich H2-air mixture (φ=2.0)".to_string(),
                               pressure: 101_325.0,
                               temperature: 300.0,
                               composition: "H2:4 O2:1 N2:3.76".to_string(),
                               mechanism: "sandiego20161214_H2only.yaml".to_string(),
                               expected_value: 2130.5,
                               tolerance: 0.05,
                               reference: "Gamezo, V.N. et al. (2007). Flame acceleration and DDT in channels with obstacles. Proc. Combust. Inst., 31(2), 2463-2471".to_string() }]
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BenchmarkFile {
    pub benchmarks: Vec<ValidationBenchmark>,
}

/// Lee `{"benchmarks": [...]}`. Nombres repetidos o tolerancias negativas se rechazan.
pub fn load_benchmarks(path: &Path) -> Result<Vec<ValidationBenchmark>, ValidationError> {
    let body = fs::read_to_string(path)?;
    let file: BenchmarkFile = serde_json::from_str(&body)?;
    let mut seen = std::collections::HashSet::new();
    for b in &file.benchmarks {
        b.check()?;
        if !seen.insert(b.name.as_str()) {
            return Err(ValidationError::InvalidBenchmark(format!("duplicate benchmark name {}", b.name)));
        }
    }
    debug!("loaded {} benchmarks from {}", file.benchmarks.len(), path.display());
    Ok(file.benchmarks)
}
