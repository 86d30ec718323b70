//! Transportes de E/S hacia el proceso hijo.
//!
//! Ambos transportes imponen el plazo sondeando `try_wait`; al vencer, el hijo
//! se mata y se recoge. En el transporte por pipes el mismo plazo acota
//! también la espera del EOF de stdout/stderr. La interpretación del código de salida y del stdout
//! queda fuera de este módulo.
use log::debug;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::{Builder, NamedTempFile};

use thermo_core::{BridgeError, BridgeResult};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Resultado de una ejecución terminada dentro del plazo.
#[derive(Debug)]
pub struct RawOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// `None` = el plazo venció y el hijo fue terminado.
pub type RunOutcome = Option<RawOutput>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Pipe,
    File { scratch_dir: PathBuf },
}

impl Transport {
    /// Ejecuta `cmd` con `input` como stdin. El plazo cubre la llamada
    /// completa, incluida la lectura de stdout/stderr.
    pub fn run(&self, cmd: Command, input: &[u8], timeout: Duration) -> BridgeResult<RunOutcome> {
        match self {
            Transport::Pipe => run_piped(cmd, input, timeout),
            Transport::File { scratch_dir } => run_with_files(cmd, input, timeout, scratch_dir),
        }
    }
}

fn spawn(mut cmd: Command) -> BridgeResult<Child> {
    cmd.spawn()
       .map_err(|e| BridgeError::Process(format!("failed to launch bridge process: {e}")))
}

/// Espera al hijo hasta `deadline`. Devuelve `None` si hubo que matarlo.
fn wait_until(child: &mut Child, deadline: Instant) -> BridgeResult<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            debug!("deadline reached, killing pid {}", child.id());
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Lee `source` hasta EOF en un hilo propio y entrega el texto por canal.
fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut src) = source {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = src.read_to_end(&mut buf);
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
    }
    rx
}

/// `None` si el EOF no llega antes de `deadline` (un nieto conserva el pipe).
fn collect_until(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn run_piped(mut cmd: Command, input: &[u8], timeout: Duration) -> BridgeResult<RunOutcome> {
    cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let deadline = Instant::now() + timeout;
    let mut child = spawn(cmd)?;

    // stdin se escribe en un hilo suelto: un hijo que no lee no debe bloquearnos
    if let Some(mut pipe) = child.stdin.take() {
        let payload = input.to_vec();
        thread::spawn(move || {
            let _ = pipe.write_all(&payload);
        });
    }
    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let Some(status) = wait_until(&mut child, deadline)? else {
        return Ok(None);
    };
    // los hilos lectores que sigan bloqueados terminan solos cuando el nieto cierre el pipe
    match (collect_until(&stdout, deadline), collect_until(&stderr, deadline)) {
        (Some(stdout), Some(stderr)) => Ok(Some(RawOutput { status, stdout, stderr })),
        _ => {
            debug!("pid {} exited but its pipes stayed open past the deadline", child.id());
            Ok(None)
        }
    }
}

fn scratch_file(dir: &Path, kind: &str, suffix: &str) -> BridgeResult<NamedTempFile> {
    Builder::new().prefix(&format!("sdt_{kind}_{}_", std::process::id()))
                  .suffix(suffix)
                  .tempfile_in(dir)
                  .map_err(|e| BridgeError::Process(format!("failed to create {kind} file in {}: {e}", dir.display())))
}

/// Los tres archivos temporales se eliminan al salir de alcance, cualquiera
/// que sea el resultado.
fn run_with_files(mut cmd: Command, input: &[u8], timeout: Duration, dir: &Path) -> BridgeResult<RunOutcome> {
    let mut input_file = scratch_file(dir, "input", ".json")?;
    input_file.write_all(input)?;
    input_file.flush()?;
    let output = scratch_file(dir, "output", ".json")?.into_temp_path();
    let error = scratch_file(dir, "error", ".txt")?.into_temp_path();

    cmd.stdin(input_file.reopen()?)
       .stdout(fs::File::create(&output)?)
       .stderr(fs::File::create(&error)?);
    let deadline = Instant::now() + timeout;
    let mut child = spawn(cmd)?;
    let Some(status) = wait_until(&mut child, deadline)? else {
        return Ok(None);
    };
    let stdout = fs::read_to_string(&output).map_err(|e| {
                                                BridgeError::Process(format!("failed to read output file {}: {e}",
                                                                             output.display()))
                                            })?;
    let stderr = fs::read_to_string(&error).unwrap_or_default();
    Ok(Some(RawOutput { status, stdout, stderr }))
}
