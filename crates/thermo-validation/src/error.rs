use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("validation framework is not enabled")]
    Disabled,
    #[error("benchmark not found: {0}")]
    BenchmarkNotFound(String),
    #[error("invalid benchmark: {0}")]
    InvalidBenchmark(String),
    #[error("validation io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("validation file parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
