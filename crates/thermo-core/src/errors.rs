//! Errores del puente de cómputo.
//!
//! La decisión de reintentar depende sólo de `ErrorKind` (función pura
//! `is_retryable`), nunca de inspeccionar el mensaje.

use serde::{Deserialize, Serialize};
use thermo_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    ProcessError,
    TimeoutError,
    ProtocolError,
    ThermodynamicError,
}

impl ErrorKind {
    /// Nombre estable usado como categoría en telemetría.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::ProcessError => "ProcessError",
            ErrorKind::TimeoutError => "TimeoutError",
            ErrorKind::ProtocolError => "ProtocolError",
            ErrorKind::ThermodynamicError => "ThermodynamicError",
        }
    }
}

/// Errores transitorios del entorno (crash, timeout) se reintentan; errores de
/// entrada, de protocolo o reportados por el toolkit no.
pub fn is_retryable(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::ProcessError | ErrorKind::TimeoutError)
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("subprocess error: {0}")]
    Process(String),
    #[error("timeout error: {0}")]
    Timeout(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("thermodynamic error: {0}")]
    Thermodynamic(String),
    /// Se agotaron los intentos; conserva el último error observado.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<BridgeError> },
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidInput(_) => ErrorKind::InvalidInput,
            BridgeError::Process(_) => ErrorKind::ProcessError,
            BridgeError::Timeout(_) => ErrorKind::TimeoutError,
            BridgeError::Protocol(_) => ErrorKind::ProtocolError,
            BridgeError::Thermodynamic(_) => ErrorKind::ThermodynamicError,
            BridgeError::RetriesExhausted { last, .. } => last.kind(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        // un error ya agotado no vuelve a entrar al bucle de reintentos
        !matches!(self, BridgeError::RetriesExhausted { .. }) && is_retryable(self.kind())
    }

    /// Mensaje sin el prefijo de la variante.
    pub fn message(&self) -> String {
        match self {
            BridgeError::InvalidInput(m)
            | BridgeError::Process(m)
            | BridgeError::Timeout(m)
            | BridgeError::Protocol(m)
            | BridgeError::Thermodynamic(m) => m.clone(),
            BridgeError::RetriesExhausted { last, .. } => last.message(),
        }
    }
}

impl From<DomainError> for BridgeError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::ValidationError(m) => BridgeError::InvalidInput(m),
            DomainError::InvariantViolation(m) => BridgeError::Protocol(m),
            DomainError::SerializationError(m) => BridgeError::Protocol(m),
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        BridgeError::Process(e.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Protocol(e.to_string())
    }
}
