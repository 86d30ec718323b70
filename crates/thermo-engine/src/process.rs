use log::debug;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use thermo_core::{BridgeError, BridgeResult};

use crate::config::{BridgeConfig, TransportKind};
use crate::protocol::{envelope, parse_response};
use crate::transport::Transport;

/// Código de salida de `timeout(1)`; el script puente lo reutiliza cuando
/// aborta por su cuenta un cálculo demasiado largo.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Un intento de invocación del toolkit: recibe el nombre de la función y el
/// payload, devuelve el objeto `result` ya validado.
///
/// Es la costura de inyección: los tests sustituyen el proceso real por
/// implementaciones en memoria.
pub trait Invoke: Send + Sync {
    fn invoke(&self, function: &str, payload: &Value) -> BridgeResult<Value>;
}

/// Lanza `<python> <script>` por invocación y habla el protocolo JSON.
#[derive(Debug)]
pub struct ProcessBridge {
    python_path: String,
    script: PathBuf,
    working_dir: PathBuf,
    mechanism_dir: PathBuf,
    timeout: Duration,
    transport: Transport,
    launches: AtomicU64,
}

impl ProcessBridge {
    pub fn from_config(config: &BridgeConfig) -> Self {
        let transport = match config.transport {
            TransportKind::Pipe => Transport::Pipe,
            TransportKind::File => Transport::File { scratch_dir: std::env::temp_dir() },
        };
        Self { python_path: config.python_path.clone(),
               script: config.bridge_script.clone(),
               working_dir: config.working_dir.clone(),
               mechanism_dir: config.mechanism_dir.clone(),
               timeout: config.timeout(),
               transport,
               launches: AtomicU64::new(0) }
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn transport(&self) -> &Transport { &self.transport }

    /// Procesos lanzados desde la creación.
    pub fn launch_count(&self) -> u64 { self.launches.load(Ordering::Relaxed) }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.python_path);
        cmd.arg(&self.script)
           .current_dir(&self.working_dir)
           .env("THERMO_MECHANISM_DIR", &self.mechanism_dir);
        cmd
    }
}

impl Invoke for ProcessBridge {
    fn invoke(&self, function: &str, payload: &Value) -> BridgeResult<Value> {
        if !self.script.is_file() {
            return Err(BridgeError::Process(format!("bridge script not found: {}", self.script.display())));
        }
        let request = serde_json::to_vec(&envelope(function, payload))?;
        debug!("launching {} {} for '{function}'", self.python_path, self.script.display());

        let start = Instant::now();
        self.launches.fetch_add(1, Ordering::Relaxed);
        let outcome = self.transport.run(self.command(), &request, self.timeout)?;
        let elapsed = start.elapsed().as_millis();

        let Some(output) = outcome else {
            return Err(BridgeError::Timeout(format!("bridge script timed out after {} ms",
                                                    self.timeout.as_millis())));
        };
        debug!("'{function}' finished in {elapsed} ms with {}", output.status);
        match output.status.code() {
            Some(0) => parse_response(&output.stdout),
            Some(TIMEOUT_EXIT_CODE) => {
                Err(BridgeError::Timeout(format!("bridge script reported timeout (exit {TIMEOUT_EXIT_CODE})")))
            }
            _ => {
                let mut msg = format!("bridge script failed with {}", output.status);
                let stderr = output.stderr.trim();
                if !stderr.is_empty() {
                    msg.push_str(&format!("; stderr: {stderr}"));
                }
                Err(BridgeError::Process(msg))
            }
        }
    }
}
