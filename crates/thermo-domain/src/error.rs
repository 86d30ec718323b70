use thiserror::Error;

/// Error del dominio termodinámico.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Entrada fuera de la envolvente física o con formato inválido.
    #[error("{0}")]
    ValidationError(String),
    /// Un resultado externo viola un invariante físico (p. ej. densidad <= 0).
    #[error("{0}")]
    InvariantViolation(String),
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::SerializationError(e.to_string())
    }
}
