use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use thermo_core::{BridgeError, BridgeResult};
use thermo_domain::InitialConditions;
use thermo_validation::{load_benchmarks, save_report, standard_benchmarks, CjSpeedSource, ValidationBenchmark,
                        ValidationEngine, ValidationError};

/// Devuelve un valor fijo por composición; composiciones desconocidas fallan.
struct TableSource {
    by_composition: HashMap<String, f64>,
    calls: AtomicUsize,
}

impl TableSource {
    fn new(entries: &[(&str, f64)]) -> Self {
        Self { by_composition: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
               calls: AtomicUsize::new(0) }
    }
}

impl CjSpeedSource for TableSource {
    fn cj_speed(&self, conditions: &InitialConditions) -> BridgeResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.by_composition
            .get(&conditions.composition().to_cantera_string())
            .copied()
            .ok_or_else(|| BridgeError::Thermodynamic("CJ solver did not converge".to_string()))
    }
}

fn benchmark(name: &str, composition: &str, expected: f64, tolerance: f64) -> ValidationBenchmark {
    ValidationBenchmark { name: name.to_string(),
                          description: String::new(),
                          pressure: 101_325.0,
                          temperature: 300.0,
                          composition: composition.to_string(),
                          mechanism: "h2.yaml".to_string(),
                          expected_value: expected,
                          tolerance,
                          reference: "Unknown".to_string() }
}

#[test]
fn tolerance_scenario_pass_and_fail() {
    let engine = ValidationEngine::with_benchmarks(true, vec![benchmark("close", "H2:2 O2:1", 1975.0, 0.05),
                                                               benchmark("far", "H2:3 O2:1", 1975.0, 0.05)]);
    let source = TableSource::new(&[("H2:2 O2:1", 2000.0), ("H2:3 O2:1", 2200.0)]);
    let report = engine.run(&source).unwrap();
    assert_eq!((report.total, report.passed, report.failed), (2, 1, 1));
    assert_eq!(report.overall_accuracy, 50.0);
    let close = engine.last_metric("close").unwrap();
    assert!(close.passed);
    assert!((close.relative_error - 0.012_66).abs() < 1e-4);
    let far = engine.last_metric("far").unwrap();
    assert!(!far.passed);
    assert!((far.relative_error - 0.113_9).abs() < 1e-3);
    assert!((engine.current_accuracy_score() - 0.5).abs() < 1e-12);
}

#[test]
fn self_benchmark_scores_full_accuracy() {
    let source = TableSource::new(&[("H2:2 O2:1 N2:3.76", 1975.3), ("H2:4 O2:1 N2:3.76", 2130.5)]);
    let engine = ValidationEngine::new(true);
    let report = engine.run(&source).unwrap();
    assert!(report.all_passed());
    assert_eq!(report.overall_accuracy, 100.0);
    assert_eq!(report.mean_relative_error, 0.0);
    assert_eq!(engine.current_accuracy_score(), 1.0);
}

#[test]
fn errors_are_counted_and_do_not_abort() {
    let engine = ValidationEngine::with_benchmarks(true, vec![benchmark("broken", "Xe:1", 1000.0, 0.05),
                                                               benchmark("bad_input", "garbage", 1000.0, 0.05),
                                                               benchmark("ok", "H2:2 O2:1", 1975.0, 0.05)]);
    let source = TableSource::new(&[("H2:2 O2:1", 1975.0)]);
    let report = engine.run(&source).unwrap();
    assert_eq!((report.total, report.passed, report.failed), (3, 1, 2));
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].benchmark, "broken");
    assert!(report.failures[0].message.contains("did not converge"));
    assert!(report.failures[1].message.starts_with("invalid input"));
    // el caso con entrada inválida nunca llega a la fuente
    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.mean_relative_error, 0.0);
    assert!(engine.last_metric("broken").is_none());
}

#[test]
fn disabled_engine_refuses_to_run() {
    let engine = ValidationEngine::new(false);
    let source = TableSource::new(&[]);
    assert!(matches!(engine.run(&source), Err(ValidationError::Disabled)));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn run_single_by_name() {
    let engine = ValidationEngine::new(true);
    let source = TableSource::new(&[("H2:4 O2:1 N2:3.76", 2100.0)]);
    let report = engine.run_single(&source, "H2_air_rich").unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.passed, 1);
    assert!(matches!(engine.run_single(&source, "nope"), Err(ValidationError::BenchmarkNotFound(_))));
}

#[test]
fn same_benchmark_set_hashes_identically() {
    let engine = ValidationEngine::new(true);
    let source = TableSource::new(&[]);
    let a = engine.run(&source).unwrap();
    let b = engine.run(&source).unwrap();
    assert_eq!(a.benchmark_set_hash, b.benchmark_set_hash);
    assert_ne!(a.run_id, b.run_id);
    let single = engine.run_single(&source, "H2_air_STP").unwrap();
    assert_ne!(single.benchmark_set_hash, a.benchmark_set_hash);
}

#[test]
fn benchmark_file_and_report_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let bench_path = dir.path().join("benchmarks.json");
    std::fs::write(&bench_path,
                   serde_json::json!({ "benchmarks": standard_benchmarks() }).to_string()).unwrap();
    let mut engine = ValidationEngine::with_benchmarks(true, Vec::new());
    assert_eq!(engine.load_benchmarks(&bench_path).unwrap(), 2);

    let source = TableSource::new(&[("H2:2 O2:1 N2:3.76", 1980.0)]);
    let report = engine.run(&source).unwrap();
    let report_path = dir.path().join("reports").join("validation.json");
    save_report(&report, &report_path).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(saved["total"], 2);
    assert_eq!(saved["passed"], 1);
    assert_eq!(saved["results"][0]["benchmark"], "H2_air_STP");
    assert_eq!(saved["failures"][0]["benchmark"], "H2_air_rich");
}

#[test]
fn benchmark_file_rejects_duplicates_and_bad_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("b.json");
    let one = benchmark("dup", "H2:2 O2:1", 1975.0, 0.05);
    std::fs::write(&path, serde_json::json!({ "benchmarks": [one.clone(), one] }).to_string()).unwrap();
    assert!(matches!(load_benchmarks(&path), Err(ValidationError::InvalidBenchmark(_))));

    let neg = benchmark("neg", "H2:2 O2:1", 1975.0, -0.1);
    std::fs::write(&path, serde_json::json!({ "benchmarks": [neg] }).to_string()).unwrap();
    assert!(matches!(load_benchmarks(&path), Err(ValidationError::InvalidBenchmark(_))));

    std::fs::write(&path, "{").unwrap();
    assert!(matches!(load_benchmarks(&path), Err(ValidationError::Parse(_))));
    assert!(matches!(load_benchmarks(&dir.path().join("missing.json")), Err(ValidationError::Io(_))));
}
