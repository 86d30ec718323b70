pub mod core_error;

pub use core_error::CoreError;
pub use thermo_domain::DomainError;
