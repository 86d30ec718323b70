//! thermo-engine: puente de procesos hacia el toolkit termoquímico externo.
//!
//! Cada cálculo lanza el script puente de Python, le envía una petición JSON y
//! valida la respuesta. `ThermoBridge` añade encima la validación de límites,
//! la caché, los reintentos y la telemetría.
pub mod bridge;
pub mod config;
pub mod mechanisms;
pub mod process;
pub mod protocol;
pub mod retry;
pub mod transport;

pub use bridge::{ThermoBridge, BATCH_THRESHOLD};
pub use config::{BridgeConfig, TransportKind};
pub use process::{Invoke, ProcessBridge};
pub use retry::{RetryController, RetryPolicy};
pub use transport::Transport;
