//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y expone una estructura
//! inmutable (`CONFIG`).
use once_cell::sync::Lazy;
use serde::Serialize;

use thermo_engine::BridgeConfig;

/// Configuración global de la aplicación (extensible para más secciones).
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// Parámetros del puente hacia el toolkit externo.
    pub bridge: BridgeConfig,
}

impl AppConfig {
    pub fn from_env() -> Self { Self { bridge: BridgeConfig::from_env() } }
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);
