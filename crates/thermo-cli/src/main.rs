//! `thermo`: operación manual del puente de cómputo.
//!
//! Códigos de salida: 0 ok, 2 uso, 4 fallo de cálculo o validación, 5 entorno.
use log::{debug, warn};
use serde_json::json;
use std::path::PathBuf;
use std::process::exit;

use thermo_domain::InitialConditions;
use thermo_engine::{BridgeConfig, ThermoBridge};
use thermo_validation::{save_report, ValidationEngine};

const EXIT_USAGE: i32 = 2;
const EXIT_FAILURE: i32 = 4;
const EXIT_ENV: i32 = 5;

const USAGE: &str = "Uso: thermo [--verbose] <comando>
  test-connection
  mechanisms
  validate-mechanism --mechanism <M>
  cj --pressure <Pa> --temperature <K> --composition <Q> --mechanism <M>
  validate [--benchmarks <FILE>] [--report <FILE>] [--only <NAME>]
  cache stats|clear
  stats";

#[derive(Debug, PartialEq)]
enum Command {
    TestConnection,
    Mechanisms,
    ValidateMechanism { mechanism: String },
    Cj { pressure: f64, temperature: f64, composition: String, mechanism: String },
    Validate { benchmarks: Option<PathBuf>, report: Option<PathBuf>, only: Option<String> },
    CacheStats,
    CacheClear,
    Stats,
}

#[derive(Debug, PartialEq)]
struct Cli {
    verbose: bool,
    command: Command,
}

/// Pares `--flag valor` a partir de `args`. Flags desconocidos son error.
fn options(args: &[String], allowed: &[&str]) -> Result<Vec<(String, String)>, String> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        if !allowed.contains(&flag) {
            return Err(format!("opción desconocida: {flag}"));
        }
        let value = args.get(i + 1).ok_or_else(|| format!("falta valor para {flag}"))?;
        out.push((flag.to_string(), value.clone()));
        i += 2;
    }
    Ok(out)
}

fn take(opts: &[(String, String)], flag: &str) -> Option<String> {
    opts.iter().rev().find(|(f, _)| f == flag).map(|(_, v)| v.clone())
}

fn require(opts: &[(String, String)], flag: &str) -> Result<String, String> {
    take(opts, flag).ok_or_else(|| format!("falta {flag}"))
}

fn number(opts: &[(String, String)], flag: &str) -> Result<f64, String> {
    let raw = require(opts, flag)?;
    raw.parse().map_err(|_| format!("{flag} debe ser numérico: {raw}"))
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut rest = args;
    let mut verbose = false;
    while let Some(first) = rest.first() {
        match first.as_str() {
            "--verbose" | "-v" => verbose = true,
            _ => break,
        }
        rest = &rest[1..];
    }
    let (name, tail) = rest.split_first().ok_or_else(|| "falta comando".to_string())?;
    let command = match name.as_str() {
        "test-connection" if tail.is_empty() => Command::TestConnection,
        "mechanisms" if tail.is_empty() => Command::Mechanisms,
        "stats" if tail.is_empty() => Command::Stats,
        "validate-mechanism" => {
            let o = options(tail, &["--mechanism"])?;
            Command::ValidateMechanism { mechanism: require(&o, "--mechanism")? }
        }
        "cj" => {
            let o = options(tail, &["--pressure", "--temperature", "--composition", "--mechanism"])?;
            Command::Cj { pressure: number(&o, "--pressure")?,
                          temperature: number(&o, "--temperature")?,
                          composition: require(&o, "--composition")?,
                          mechanism: require(&o, "--mechanism")? }
        }
        "validate" => {
            let o = options(tail, &["--benchmarks", "--report", "--only"])?;
            Command::Validate { benchmarks: take(&o, "--benchmarks").map(PathBuf::from),
                                report: take(&o, "--report").map(PathBuf::from),
                                only: take(&o, "--only") }
        }
        "cache" => match tail {
            [sub] if sub == "stats" => Command::CacheStats,
            [sub] if sub == "clear" => Command::CacheClear,
            _ => return Err("cache requiere stats|clear".to_string()),
        },
        other => return Err(format!("comando desconocido o argumentos de más: {other}")),
    };
    Ok(Cli { verbose, command })
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("[thermo] error serializando salida: {e}"),
    }
}

fn save_cache_or_warn(bridge: &ThermoBridge) {
    if bridge.caching_enabled() {
        if let Err(e) = bridge.save_cache() {
            warn!("no se pudo guardar la caché: {e}");
        }
    }
}

fn run(cli: Cli, config: BridgeConfig) -> i32 {
    match cli.command {
        Command::TestConnection => {
            let bridge = ThermoBridge::new(config);
            if bridge.test_connection() {
                println!("ok");
                0
            } else {
                eprintln!("[thermo] el toolkit no responde");
                EXIT_ENV
            }
        }
        Command::Mechanisms => {
            let bridge = ThermoBridge::new(config);
            for m in bridge.available_mechanisms() {
                println!("{m}");
            }
            0
        }
        Command::ValidateMechanism { mechanism } => {
            let bridge = ThermoBridge::new(config);
            let valid = bridge.validate_mechanism(&mechanism);
            print_json(&json!({ "mechanism": mechanism, "valid": valid }));
            if valid { 0 } else { EXIT_FAILURE }
        }
        Command::Cj { pressure, temperature, composition, mechanism } => {
            let conditions = match InitialConditions::new(pressure, temperature, &composition, &mechanism) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("[thermo cj] {e}");
                    return EXIT_USAGE;
                }
            };
            let bridge = ThermoBridge::new(config);
            let code = match bridge.calculate_cj_speed(&conditions) {
                Ok(speed) => {
                    print_json(&json!({ "conditions": conditions, "cj_speed": speed, "unit": "m/s" }));
                    0
                }
                Err(e) => {
                    eprintln!("[thermo cj] {e}");
                    EXIT_FAILURE
                }
            };
            save_cache_or_warn(&bridge);
            code
        }
        Command::Validate { benchmarks, report, only } => {
            let bridge = ThermoBridge::new(config);
            // pedir la corrida explícitamente la habilita
            let mut engine = ValidationEngine::new(true);
            if let Some(path) = benchmarks {
                if let Err(e) = engine.load_benchmarks(&path) {
                    eprintln!("[thermo validate] {e}");
                    return EXIT_ENV;
                }
            }
            let outcome = match only {
                Some(name) => engine.run_single(&bridge, &name),
                None => engine.run(&bridge),
            };
            let result = match outcome {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("[thermo validate] {e}");
                    return EXIT_FAILURE;
                }
            };
            save_cache_or_warn(&bridge);
            if let Some(path) = report {
                if let Err(e) = save_report(&result, &path) {
                    eprintln!("[thermo validate] {e}");
                    return EXIT_ENV;
                }
            }
            print_json(&json!({
                "run_id": result.run_id,
                "total": result.total,
                "passed": result.passed,
                "failed": result.failed,
                "overall_accuracy": result.overall_accuracy,
                "mean_relative_error": result.mean_relative_error,
                "accuracy_score": engine.current_accuracy_score(),
                "failures": result.failures,
            }));
            if result.all_passed() { 0 } else { EXIT_FAILURE }
        }
        Command::CacheStats => {
            let bridge = cached_bridge(config);
            let stats = bridge.cache_stats();
            print_json(&json!({
                "file": bridge.cache_file(),
                "stats": stats,
                "hit_rate": stats.hit_rate(),
            }));
            0
        }
        Command::CacheClear => {
            let bridge = cached_bridge(config);
            bridge.clear_cache();
            match bridge.save_cache() {
                Ok(()) => {
                    println!("caché vaciada: {}", bridge.cache_file().display());
                    0
                }
                Err(e) => {
                    eprintln!("[thermo cache] {e}");
                    EXIT_ENV
                }
            }
        }
        Command::Stats => {
            let bridge = cached_bridge(config);
            let snapshot = bridge.telemetry().snapshot();
            print_json(&json!({
                "telemetry": snapshot,
                "success_rate": snapshot.success_rate(),
                "cache": bridge.cache_stats(),
            }));
            0
        }
    }
}

fn main() {
    // .env puede traer RUST_LOG y las THERMO_*
    thermo_engine::config::init_dotenv();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[thermo] {e}\n{USAGE}");
            exit(EXIT_USAGE);
        }
    };
    let config = BridgeConfig::from_env();
    let level = if cli.verbose || config.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    debug!("config: {config:?}");
    exit(run(cli, config));
}

/// Puente con la caché activa; el snapshot se carga una sola vez, al construirlo.
fn cached_bridge(mut config: BridgeConfig) -> ThermoBridge {
    config.caching_enabled = true;
    ThermoBridge::new(config)
}
