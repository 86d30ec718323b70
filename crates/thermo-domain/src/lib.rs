// thermo-domain library entry point
pub mod bounds;
pub mod composition;
pub mod conditions;
pub mod error;
pub mod state;
pub use composition::Composition;
pub use conditions::InitialConditions;
pub use error::DomainError;
pub use state::{ConservationErrors, ThermodynamicState};
