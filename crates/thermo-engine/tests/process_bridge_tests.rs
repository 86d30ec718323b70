#![cfg(unix)]
//! Puente real contra toolkits falsos escritos en /bin/sh.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use thermo_core::{BridgeError, ErrorKind};
use thermo_domain::InitialConditions;
use thermo_engine::{BridgeConfig, ThermoBridge, Transport, TransportKind};

const CJ_OK: &str = r#"{"success": true, "result": {"cj_speed": 1975.3}}"#;

/// Escribe un script que guarda la petición en `request.json` y luego ejecuta `body`.
fn fake_toolkit(dir: &TempDir, body: &str) -> BridgeConfig {
    let script = dir.path().join("fake_bridge.sh");
    fs::write(&script, format!("cat > request.json\n{body}\n")).unwrap();
    BridgeConfig { python_path: "/bin/sh".to_string(),
                   bridge_script: script,
                   working_dir: dir.path().to_path_buf(),
                   mechanism_dir: dir.path().join("mechanisms"),
                   timeout_ms: 5_000,
                   backoff_base_ms: 1,
                   cache_file: dir.path().join("cache.json"),
                   ..BridgeConfig::default() }
}

fn printing(json: &str) -> String { format!("printf '%s' '{json}'") }

fn h2_air() -> InitialConditions { InitialConditions::new(101_325.0, 300.0, "H2:2 O2:1 N2:3.76", "sandiego.yaml").unwrap() }

fn last_request(dir: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(dir.join("request.json")).unwrap()).unwrap()
}

#[test]
fn cj_speed_end_to_end_with_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake_toolkit(&dir, &printing(CJ_OK));
    config.caching_enabled = true;
    let bridge = ThermoBridge::new(config);

    let first = bridge.calculate_cj_speed(&h2_air()).unwrap();
    assert!((1900.0..=2000.0).contains(&first));
    let second = bridge.calculate_cj_speed(&h2_air()).unwrap();
    assert_eq!(first, second);
    assert_eq!(bridge.launch_count(), 1);
    assert_eq!(bridge.cache_stats().hits, 1);

    let req = last_request(dir.path());
    assert_eq!(req["function"], "CJspeed");
    assert_eq!(req["P1"], 101_325.0);
    assert_eq!(req["q"], "H2:2 O2:1 N2:3.76");
    assert_eq!(req["mech"], "sandiego.yaml");
    assert_eq!(bridge.telemetry().successful_calls(), 2);
}

#[test]
fn caching_disabled_launches_every_time() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = ThermoBridge::new(fake_toolkit(&dir, &printing(CJ_OK)));
    bridge.calculate_cj_speed(&h2_air()).unwrap();
    bridge.calculate_cj_speed(&h2_air()).unwrap();
    assert_eq!(bridge.launch_count(), 2);
}

#[test]
fn out_of_bounds_input_never_launches() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = ThermoBridge::new(fake_toolkit(&dir, &printing(CJ_OK)));
    let err = bridge.cj_speed(10.0, 300.0, "H2:2 O2:1", "m.yaml").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = bridge.cj_speed(101_325.0, 300.0, "not a mixture", "m.yaml").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(bridge.launch_count(), 0);
    assert_eq!(bridge.telemetry().validation_failures(), 2);
    assert_eq!(bridge.telemetry().retry_attempts(), 0);
}

#[test]
fn timeout_is_retried_up_to_max_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake_toolkit(&dir, "exec sleep 5");
    config.timeout_ms = 150;
    let bridge = ThermoBridge::new(config);
    let err = bridge.calculate_cj_speed(&h2_air()).unwrap_err();
    assert!(matches!(err, BridgeError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(err.kind(), ErrorKind::TimeoutError);
    assert_eq!(bridge.launch_count(), 3);
    let t = bridge.telemetry();
    assert_eq!(t.retry_attempts(), 2);
    assert_eq!(t.timeout_failures(), 1);
    assert_eq!(t.failed_calls(), 1);
    assert_eq!(t.error_counts().get("TimeoutError"), Some(&1));
}

#[test]
fn exit_code_124_maps_to_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake_toolkit(&dir, "exit 124");
    config.max_attempts = 1;
    let bridge = ThermoBridge::new(config);
    assert_eq!(bridge.calculate_cj_speed(&h2_air()).unwrap_err().kind(), ErrorKind::TimeoutError);
}

#[test]
fn crash_with_stderr_is_a_retryable_process_error() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = ThermoBridge::new(fake_toolkit(&dir, "echo 'ImportError: cantera' >&2; exit 1"));
    let err = bridge.calculate_cj_speed(&h2_air()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProcessError);
    assert!(err.to_string().contains("ImportError: cantera"));
    assert_eq!(bridge.launch_count(), 3);
}

#[test]
fn toolkit_failure_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let body = printing(r#"{"success": false, "errors": ["CJ solver did not converge"]}"#);
    let bridge = ThermoBridge::new(fake_toolkit(&dir, &body));
    let err = bridge.calculate_cj_speed(&h2_air()).unwrap_err();
    assert_eq!(err, BridgeError::Thermodynamic("CJ solver did not converge".to_string()));
    assert_eq!(bridge.launch_count(), 1);
    assert_eq!(bridge.telemetry().recent_errors().len(), 1);
}

#[test]
fn malformed_response_is_protocol_error_and_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = ThermoBridge::new(fake_toolkit(&dir, &printing(r#"{"result": {"cj_speed": 1975.3}}"#)));
    assert_eq!(bridge.calculate_cj_speed(&h2_air()).unwrap_err().kind(), ErrorKind::ProtocolError);
    assert_eq!(bridge.launch_count(), 1);
}

#[test]
fn implausible_cj_speed_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = ThermoBridge::new(fake_toolkit(&dir, &printing(r#"{"success": true, "result": {"cj_speed": 25000.0}}"#)));
    assert_eq!(bridge.calculate_cj_speed(&h2_air()).unwrap_err().kind(), ErrorKind::ProtocolError);
}

#[test]
fn file_transport_cleans_up_scratch_files() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let mut config = fake_toolkit(&dir, &printing(CJ_OK));
    config.transport = TransportKind::File;
    let bridge = ThermoBridge::with_invoker(config.clone(),
                                            thermo_engine::ProcessBridge::from_config(&config)
                                                .with_transport(Transport::File { scratch_dir: scratch.path().to_path_buf() }));
    assert_eq!(bridge.calculate_cj_speed(&h2_air()).unwrap(), 1975.3);
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);

    // también tras un fallo de parseo
    fs::write(&config.bridge_script, "cat > /dev/null\necho garbage\n").unwrap();
    assert!(bridge.calculate_cj_speed(&h2_air()).is_err());
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn missing_script_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake_toolkit(&dir, "");
    config.bridge_script = dir.path().join("nope.py");
    config.max_attempts = 1;
    let bridge = ThermoBridge::new(config);
    let err = bridge.calculate_cj_speed(&h2_air()).unwrap_err();
    assert!(err.to_string().contains("bridge script not found"));
    assert_eq!(bridge.launch_count(), 0);
    assert!(!bridge.test_connection());
}

#[test]
fn large_batch_uses_single_request() {
    let dir = tempfile::tempdir().unwrap();
    let item = r#"{"success": true, "result": {"cj_speed": 1975.3}}"#;
    let items = vec![item; 5].join(",");
    let body = printing(&format!(r#"{{"success": true, "result": {{"batch_results": [{items}]}}}}"#));
    let bridge = ThermoBridge::new(fake_toolkit(&dir, &body));
    let conditions = vec![h2_air(); 5];
    let speeds = bridge.calculate_cj_speed_batch(&conditions).unwrap();
    assert_eq!(speeds, vec![1975.3; 5]);
    assert_eq!(bridge.launch_count(), 1);
    let req = last_request(dir.path());
    assert_eq!(req["function"], "batch");
    assert_eq!(req["requests"].as_array().map(Vec::len), Some(5));
    assert_eq!(req["requests"][0]["function"], "CJspeed");
    assert_eq!(bridge.telemetry().total_calls(), 5);
    assert_eq!(bridge.telemetry().successful_calls(), 5);
}

#[test]
fn batch_item_failure_fails_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let ok = r#"{"success": true, "result": {"cj_speed": 1975.3}}"#;
    let bad = r#"{"success": false, "errors": ["bad mixture"]}"#;
    let body = printing(&format!(r#"{{"success": true, "result": {{"batch_results": [{ok},{ok},{bad},{ok}]}}}}"#));
    let bridge = ThermoBridge::new(fake_toolkit(&dir, &body));
    let err = bridge.calculate_cj_speed_batch(&vec![h2_air(); 4]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ThermodynamicError);
    assert!(err.to_string().contains("batch item 2 failed: bad mixture"));
    assert_eq!(bridge.telemetry().failed_calls(), 4);
}

#[test]
fn cache_survives_restart_through_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake_toolkit(&dir, &printing(CJ_OK));
    config.caching_enabled = true;
    {
        let bridge = ThermoBridge::new(config.clone());
        bridge.calculate_cj_speed(&h2_air()).unwrap();
        bridge.save_cache().unwrap();
    }
    let warm = ThermoBridge::new(config);
    assert_eq!(warm.calculate_cj_speed(&h2_air()).unwrap(), 1975.3);
    assert_eq!(warm.launch_count(), 0);
    assert!(warm.telemetry().performance().total_executions >= 1);
}

#[test]
fn connection_and_mechanism_checks() {
    let dir = tempfile::tempdir().unwrap();
    let body = r#"if grep -q validate_mechanism request.json; then
  printf '%s' '{"success": true, "result": {"valid": false, "error": "file not found"}}'
else
  printf '{"success": true, "result": {"cantera_available": true, "test_passed": true, "dir": "%s"}}' "$THERMO_MECHANISM_DIR"
fi"#;
    let config = fake_toolkit(&dir, body);
    let bridge = ThermoBridge::new(config);
    assert!(bridge.test_connection());
    assert!(!bridge.validate_mechanism("missing.yaml"));
    assert_eq!(last_request(dir.path())["mechanism"], "missing.yaml");
}

#[test]
fn small_timeout_applies_per_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake_toolkit(&dir, "exec sleep 5");
    config.timeout_ms = 100;
    config.max_attempts = 2;
    let bridge = ThermoBridge::new(config);
    let start = std::time::Instant::now();
    assert!(bridge.calculate_cj_speed(&h2_air()).is_err());
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[test]
fn background_helper_holding_stdout_does_not_outlive_the_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fake_toolkit(&dir, &format!("sleep 4 &\n{}", printing(CJ_OK)));
    config.timeout_ms = 500;
    config.max_attempts = 1;
    let bridge = ThermoBridge::new(config);
    let start = std::time::Instant::now();
    let err = bridge.calculate_cj_speed(&h2_air()).unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(2), "blocked for {:?}", start.elapsed());
    assert_eq!(err.kind(), ErrorKind::TimeoutError);
    assert_eq!(bridge.telemetry().timeout_failures(), 1);
}
