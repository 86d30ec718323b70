//! Reintentos con backoff exponencial sobre un `Invoke`.
//!
//! Política:
//! - `max_attempts` cuenta intentos totales (3 por defecto).
//! - Backoff antes del intento n (n ≥ 2): `base * 2^(n-2)`, es decir 100, 200, 400 ms.
//! - Sólo se reintentan `ProcessError` y `TimeoutError`; el resto vuelve de inmediato.
//! - Logs: `warn!` por intento fallido reintentable.
use log::{debug, warn};
use serde_json::Value;
use std::time::Duration;

use thermo_core::{BridgeError, BridgeResult, Telemetry};

use crate::config::{BridgeConfig, DEFAULT_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS};
use crate::process::Invoke;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS,
               base_delay: Duration::from_millis(DEFAULT_BACKOFF_MS) }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self { max_attempts: config.max_attempts.max(1),
               base_delay: config.backoff_base() }
    }

    /// Espera previa al intento `attempt` (1-based). El primero no espera.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self { Self { policy } }

    pub fn policy(&self) -> RetryPolicy { self.policy }

    pub fn invoke_with_retry<I: Invoke + ?Sized>(&self,
                                                 invoker: &I,
                                                 telemetry: &Telemetry,
                                                 function: &str,
                                                 payload: &Value)
                                                 -> BridgeResult<Value> {
        let max = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match invoker.invoke(function, payload) {
                Ok(v) => {
                    if attempt > 1 {
                        debug!("'{function}' succeeded on attempt {attempt}");
                    }
                    return Ok(v);
                }
                Err(e) if e.is_retryable() && attempt < max => {
                    attempt += 1;
                    let delay = self.policy.backoff_for(attempt);
                    warn!("retryable error in '{function}' (attempt {}/{max}): {e} -> sleeping {}ms",
                          attempt - 1,
                          delay.as_millis());
                    telemetry.record_retry();
                    std::thread::sleep(delay);
                }
                Err(e) if e.is_retryable() => {
                    warn!("'{function}' failed after {attempt} attempts: {e}");
                    return Err(BridgeError::RetriesExhausted { attempts: attempt,
                                                               last: Box::new(e) });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
