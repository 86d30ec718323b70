//! Configuración del puente desde variables de entorno (`THERMO_*`).
//! Un `.env` en el directorio actual se carga una sola vez, de forma perezosa.

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thermo_core::constants::DEFAULT_CACHE_CAPACITY;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 100;
pub const DEFAULT_CACHE_FILE: &str = "cantera_cache.json";
pub const BRIDGE_SCRIPT_NAME: &str = "sdt_bridge.py";

/// Cómo se intercambian petición y respuesta con el proceso hijo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// stdin/stdout por pipes.
    #[default]
    Pipe,
    /// Archivos temporales redirigidos; alternativa para entornos sin pipes fiables.
    File,
}

impl TransportKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pipe" => Some(TransportKind::Pipe),
            "file" => Some(TransportKind::File),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BridgeConfig {
    pub python_path: String,
    pub bridge_script: PathBuf,
    pub mechanism_dir: PathBuf,
    pub working_dir: PathBuf,
    pub verbose: bool,
    pub timeout_ms: u64,
    pub caching_enabled: bool,
    pub cache_file: PathBuf,
    pub cache_capacity: usize,
    pub validation_enabled: bool,
    pub transport: TransportKind,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let working_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { python_path: "python3".to_string(),
               bridge_script: working_dir.join("python_scripts").join(BRIDGE_SCRIPT_NAME),
               mechanism_dir: PathBuf::from("./data/mechanisms"),
               working_dir,
               verbose: false,
               timeout_ms: DEFAULT_TIMEOUT_MS,
               caching_enabled: false,
               cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
               cache_capacity: DEFAULT_CACHE_CAPACITY,
               validation_enabled: false,
               transport: TransportKind::Pipe,
               max_attempts: DEFAULT_MAX_ATTEMPTS,
               backoff_base_ms: DEFAULT_BACKOFF_MS }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn flag(name: &str) -> Option<bool> {
    var(name).map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    var(name).and_then(|v| v.trim().parse().ok())
}

impl BridgeConfig {
    /// Lee `THERMO_*`; valores ausentes o ilegibles caen al default.
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        let working_dir = var("THERMO_WORKING_DIR").map(PathBuf::from).unwrap_or(defaults.working_dir);
        let bridge_script = var("THERMO_BRIDGE_SCRIPT").map(PathBuf::from)
                                                       .unwrap_or_else(|| working_dir.join("python_scripts").join(BRIDGE_SCRIPT_NAME));
        Self { python_path: var("THERMO_PYTHON_PATH").unwrap_or(defaults.python_path),
               bridge_script,
               mechanism_dir: var("THERMO_MECHANISM_DIR").map(PathBuf::from).unwrap_or(defaults.mechanism_dir),
               working_dir,
               verbose: flag("THERMO_VERBOSE").unwrap_or(defaults.verbose),
               timeout_ms: parsed("THERMO_TIMEOUT_MS").filter(|t| *t > 0).unwrap_or(defaults.timeout_ms),
               caching_enabled: flag("THERMO_CACHE_ENABLED").unwrap_or(defaults.caching_enabled),
               cache_file: var("THERMO_CACHE_FILE").map(PathBuf::from).unwrap_or(defaults.cache_file),
               cache_capacity: parsed("THERMO_CACHE_CAPACITY").filter(|c| *c > 0).unwrap_or(defaults.cache_capacity),
               validation_enabled: flag("THERMO_VALIDATION_ENABLED").unwrap_or(defaults.validation_enabled),
               transport: var("THERMO_TRANSPORT").and_then(|t| TransportKind::parse(&t)).unwrap_or(defaults.transport),
               max_attempts: parsed("THERMO_MAX_ATTEMPTS").filter(|n| *n > 0).unwrap_or(defaults.max_attempts),
               backoff_base_ms: parsed("THERMO_BACKOFF_MS").unwrap_or(defaults.backoff_base_ms) }
    }

    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }

    pub fn backoff_base(&self) -> Duration { Duration::from_millis(self.backoff_base_ms) }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() { Lazy::force(&DOTENV_LOADED); }
