use thermo_core::{BridgeError, CacheError};
use thermo_domain::DomainError;
use thermo_validation::ValidationError;
use thiserror::Error;

/// Error de aplicación: agrupa los errores de cada crate del workspace.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Error interno: {0}")]
    Internal(String),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Error de dominio: {0}")]
    Domain(#[from] DomainError),
    #[error("Error del puente: {0}")]
    Bridge(#[from] BridgeError),
    #[error("Error de caché: {0}")]
    Cache(#[from] CacheError),
    #[error("Error de validación: {0}")]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_internal_variant_format() {
        let err = CoreError::Internal("algo malo".into());
        assert_eq!(err.to_string(), "Error interno: algo malo");
    }

    #[test]
    fn test_io_variant_from() {
        let io_err = std::io::Error::other("falló IO");
        let err: CoreError = io_err.into();
        assert_eq!(err.to_string(), "Error en IO: falló IO");
    }

    #[test]
    fn test_bridge_variant_from() {
        let err: CoreError = BridgeError::Timeout("30000 ms".into()).into();
        assert_eq!(err.to_string(), "Error del puente: timeout error: 30000 ms");
    }

    #[test]
    fn test_validation_variant_from() {
        let err: CoreError = ValidationError::Disabled.into();
        assert_eq!(err.to_string(), "Error de validación: validation framework is not enabled");
    }
}
