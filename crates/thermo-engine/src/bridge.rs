//! Fachada del puente: validación de límites, caché, reintentos y telemetría
//! alrededor de cada operación del toolkit.
use log::{debug, error, info, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use thermo_core::{cache_key, BridgeError, BridgeResult, CacheError, CacheStats, ResultCache, Telemetry};
use thermo_domain::bounds::{validate_density, validate_temperature, validate_wave_speed};
use thermo_domain::{Composition, ConservationErrors, InitialConditions, ThermodynamicState};

use crate::config::BridgeConfig;
use crate::mechanisms::scan_mechanisms;
use crate::process::{Invoke, ProcessBridge};
use crate::protocol::{self, number_field, FN_BATCH, FN_CJ_SPEED, FN_EQ_STATE, FN_FROZEN_STATE, FN_POST_SHOCK_EQ,
                      FN_SOUND_SPEED_EQ, FN_TEST_CONNECTION, FN_VALIDATE_MECHANISM};
use crate::retry::{RetryController, RetryPolicy};

/// Lotes de hasta este tamaño se resuelven con llamadas individuales.
pub const BATCH_THRESHOLD: usize = 3;

pub struct ThermoBridge<I: Invoke = ProcessBridge> {
    config: BridgeConfig,
    invoker: I,
    retry: RetryController,
    cache: ResultCache,
    caching_enabled: AtomicBool,
    cache_file: Mutex<PathBuf>,
    telemetry: Telemetry,
}

impl ThermoBridge<ProcessBridge> {
    pub fn new(config: BridgeConfig) -> Self {
        let invoker = ProcessBridge::from_config(&config);
        Self::with_invoker(config, invoker)
    }

    pub fn from_env() -> Self { Self::new(BridgeConfig::from_env()) }

    pub fn launch_count(&self) -> u64 { self.invoker.launch_count() }
}

impl<I: Invoke> ThermoBridge<I> {
    /// Construye el puente sobre un invocador arbitrario. Si la configuración
    /// activa la caché, se intenta cargar el snapshot previo.
    pub fn with_invoker(config: BridgeConfig, invoker: I) -> Self {
        let bridge = Self { retry: RetryController::new(RetryPolicy::from_config(&config)),
                            cache: ResultCache::new(config.cache_capacity),
                            caching_enabled: AtomicBool::new(false),
                            cache_file: Mutex::new(config.cache_file.clone()),
                            telemetry: Telemetry::new(),
                            invoker,
                            config };
        if bridge.config.caching_enabled {
            bridge.enable_caching(true, None);
        }
        bridge
    }

    pub fn config(&self) -> &BridgeConfig { &self.config }
    pub fn invoker(&self) -> &I { &self.invoker }
    pub fn telemetry(&self) -> &Telemetry { &self.telemetry }
    pub fn cache(&self) -> &ResultCache { &self.cache }
    pub fn caching_enabled(&self) -> bool { self.caching_enabled.load(Ordering::Relaxed) }

    // ---- Operaciones ----

    /// Velocidad de Chapman-Jouguet [m/s] para las condiciones dadas.
    pub fn calculate_cj_speed(&self, conditions: &InitialConditions) -> BridgeResult<f64> {
        self.tracked(|| self.cj_speed_untracked(conditions))
    }

    /// Como `calculate_cj_speed`, construyendo y validando las condiciones.
    pub fn cj_speed(&self, pressure: f64, temperature: f64, composition: &str, mechanism: &str) -> BridgeResult<f64> {
        self.tracked(|| {
                let conditions = InitialConditions::new(pressure, temperature, composition, mechanism)?;
                self.cj_speed_untracked(&conditions)
            })
    }

    pub fn calculate_post_shock_eq(&self, shock_speed: f64, conditions: &InitialConditions) -> BridgeResult<ThermodynamicState> {
        self.tracked(|| {
                validate_wave_speed(shock_speed)?;
                debug!("post-shock equilibrium at U1={shock_speed} m/s for {conditions}");
                let result = self.call(FN_POST_SHOCK_EQ, &protocol::post_shock_payload(shock_speed, conditions))?;
                Ok(ThermodynamicState::from_result(&result)?)
            })
    }

    pub fn calculate_equilibrium_state(&self,
                                       density: f64,
                                       temperature: f64,
                                       composition: &str,
                                       mechanism: &str)
                                       -> BridgeResult<ThermodynamicState> {
        self.tracked(|| self.state_query(FN_EQ_STATE, density, temperature, composition, mechanism))
    }

    pub fn calculate_frozen_state(&self,
                                  density: f64,
                                  temperature: f64,
                                  composition: &str,
                                  mechanism: &str)
                                  -> BridgeResult<ThermodynamicState> {
        self.tracked(|| self.state_query(FN_FROZEN_STATE, density, temperature, composition, mechanism))
    }

    /// Velocidad del sonido en equilibrio [m/s] de un estado ya calculado.
    pub fn calculate_sound_speed_eq(&self, state: &ThermodynamicState, mechanism: &str) -> BridgeResult<f64> {
        self.tracked(|| {
                let result = self.call(FN_SOUND_SPEED_EQ, &protocol::sound_speed_payload(state, mechanism))?;
                let speed = number_field(&result, "sound_speed")?;
                if speed <= 0.0 {
                    return Err(BridgeError::Protocol(format!("non-positive sound speed returned: {speed} m/s")));
                }
                Ok(speed)
            })
    }

    /// Residuos de conservación entre dos estados; no lanza ningún proceso.
    pub fn calculate_fhfp(&self,
                          wave_speed: f64,
                          state1: &ThermodynamicState,
                          state2: &ThermodynamicState)
                          -> ConservationErrors {
        let errors = ConservationErrors::between(wave_speed, state1, state2);
        debug!("FHFP errors: FH={}, FP={}", errors.enthalpy_error, errors.pressure_error);
        errors
    }

    /// Velocidades CJ para varias condiciones, en el mismo orden. Lotes
    /// pequeños usan la ruta individual; los grandes viajan en una sola
    /// petición `batch` (sólo con los casos que no estén en caché).
    pub fn calculate_cj_speed_batch(&self, conditions: &[InitialConditions]) -> BridgeResult<Vec<f64>> {
        if conditions.is_empty() {
            return Ok(Vec::new());
        }
        if conditions.len() <= BATCH_THRESHOLD {
            return conditions.iter().map(|c| self.calculate_cj_speed(c)).collect();
        }
        let n = conditions.len() as u64;
        self.telemetry.record_calls(n);
        let start = Instant::now();
        match self.cj_batch_untracked(conditions) {
            Ok(speeds) => {
                self.telemetry.record_successes(n);
                self.telemetry.record_latency(start.elapsed().as_secs_f64() * 1000.0);
                Ok(speeds)
            }
            Err(e) => {
                self.telemetry.record_failed_calls(e.kind(), &format!("batch CJ speed failed: {e}"), n);
                Err(e)
            }
        }
    }

    /// `true` si el script puente responde; una sola tentativa, sin reintentos.
    pub fn test_connection(&self) -> bool {
        match self.invoker.invoke(FN_TEST_CONNECTION, &Value::Null) {
            Ok(result) => {
                let cantera = result.get("cantera_available").and_then(Value::as_bool).unwrap_or(false);
                info!("toolkit connection ok (cantera available: {cantera})");
                if let Some(passed) = result.get("test_passed").and_then(Value::as_bool) {
                    debug!("toolkit self-test passed: {passed}");
                }
                true
            }
            Err(e) => {
                warn!("toolkit connection test failed: {e}");
                false
            }
        }
    }

    /// Pregunta al toolkit si puede cargar el mecanismo.
    pub fn validate_mechanism(&self, mechanism: &str) -> bool {
        match self.invoker.invoke(FN_VALIDATE_MECHANISM, &serde_json::json!({ "mechanism": mechanism })) {
            Ok(result) => {
                let valid = result.get("valid").and_then(Value::as_bool).unwrap_or(false);
                if !valid {
                    let reason = result.get("error").and_then(Value::as_str).unwrap_or("no reason given");
                    debug!("mechanism {mechanism} rejected: {reason}");
                }
                valid
            }
            Err(e) => {
                debug!("mechanism validation error for {mechanism}: {e}");
                false
            }
        }
    }

    /// Archivos de mecanismo (`.cti`, `.yaml`) en el directorio configurado.
    pub fn available_mechanisms(&self) -> Vec<String> { scan_mechanisms(&self.config.mechanism_dir) }

    // ---- Caché ----

    /// Activa o desactiva la caché. Al activarla se carga el snapshot del
    /// archivo (el indicado o el configurado); un archivo corrupto deja la
    /// caché vacía.
    pub fn enable_caching(&self, enable: bool, cache_file: Option<&Path>) {
        let mut file = self.cache_file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(path) = cache_file {
            *file = path.to_path_buf();
        }
        self.caching_enabled.store(enable, Ordering::Relaxed);
        if !enable {
            debug!("caching disabled");
            return;
        }
        match self.cache.load_from_file(&file) {
            Ok(Some(performance)) => self.telemetry.restore_performance(performance),
            Ok(None) => debug!("no usable cache snapshot at {}, starting empty", file.display()),
            Err(e) => error!("cache load failed: {e}"),
        }
        debug!("caching enabled with file {}", file.display());
    }

    pub fn cache_file(&self) -> PathBuf { self.cache_file.lock().unwrap_or_else(PoisonError::into_inner).clone() }

    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("cache cleared");
    }

    /// Persiste la caché junto con las métricas de rendimiento actuales.
    pub fn save_cache(&self) -> Result<(), CacheError> {
        let file = self.cache_file();
        self.cache.save_to_file(&file, self.telemetry.performance())
    }

    pub fn cache_stats(&self) -> CacheStats { self.cache.stats() }

    pub fn reset_performance_metrics(&self) { self.telemetry.reset_performance(); }

    // ---- Internos ----

    /// Contabiliza una llamada: total, éxito con latencia, o error por categoría.
    fn tracked<T>(&self, op: impl FnOnce() -> BridgeResult<T>) -> BridgeResult<T> {
        self.telemetry.record_call();
        let start = Instant::now();
        let result = op();
        match &result {
            Ok(_) => {
                self.telemetry.record_success();
                self.telemetry.record_latency(start.elapsed().as_secs_f64() * 1000.0);
            }
            Err(e) => self.telemetry.record_error(e.kind(), &e.to_string()),
        }
        result
    }

    fn call(&self, function: &str, payload: &Value) -> BridgeResult<Value> {
        self.retry.invoke_with_retry(&self.invoker, &self.telemetry, function, payload)
    }

    fn key_for(&self, conditions: &InitialConditions) -> Option<String> {
        self.caching_enabled().then(|| {
                                  cache_key(FN_CJ_SPEED,
                                            conditions.pressure(),
                                            conditions.temperature(),
                                            conditions.composition(),
                                            conditions.mechanism())
                              })
    }

    fn cached_speed(&self, key: &str) -> Option<f64> {
        let value = self.cache.get(key)?;
        match value.as_f64() {
            Some(v) => Some(v),
            None => {
                // entrada de un formato anterior: se descarta
                warn!("discarding malformed cache entry {key}");
                self.cache.remove(key);
                None
            }
        }
    }

    fn cj_speed_untracked(&self, conditions: &InitialConditions) -> BridgeResult<f64> {
        let key = self.key_for(conditions);
        if let Some(speed) = key.as_deref().and_then(|k| self.cached_speed(k)) {
            debug!("CJ speed from cache: {speed} m/s");
            return Ok(speed);
        }
        debug!("calculating CJ speed for {conditions}");
        let result = self.call(FN_CJ_SPEED, &protocol::cj_speed_payload(conditions))?;
        let speed = checked_cj_speed(&result)?;
        if let Some(k) = key {
            self.cache.put(&k, Value::from(speed));
        }
        Ok(speed)
    }

    fn cj_batch_untracked(&self, conditions: &[InitialConditions]) -> BridgeResult<Vec<f64>> {
        let keys: Vec<Option<String>> = conditions.iter().map(|c| self.key_for(c)).collect();
        let mut speeds: Vec<Option<f64>> = keys.iter()
                                               .map(|k| k.as_deref().and_then(|k| self.cached_speed(k)))
                                               .collect();
        let pending: Vec<usize> = (0..conditions.len()).filter(|&i| speeds[i].is_none()).collect();
        if !pending.is_empty() {
            debug!("batch CJ speed for {} cases ({} cached)", pending.len(), conditions.len() - pending.len());
            let requests = pending.iter()
                                  .map(|&i| protocol::envelope(FN_CJ_SPEED, &protocol::cj_speed_payload(&conditions[i])))
                                  .collect();
            let result = self.call(FN_BATCH, &protocol::batch_payload(requests))?;
            let items = result.get("batch_results")
                              .and_then(Value::as_array)
                              .ok_or_else(|| BridgeError::Protocol("batch result is missing 'batch_results'".to_string()))?;
            if items.len() != pending.len() {
                return Err(BridgeError::Protocol(format!("batch returned {} results for {} requests",
                                                         items.len(),
                                                         pending.len())));
            }
            for (&i, item) in pending.iter().zip(items) {
                let speed = match protocol::validate_response(item.clone()) {
                    Ok(r) => checked_cj_speed(&r)?,
                    Err(BridgeError::Thermodynamic(m)) => {
                        return Err(BridgeError::Thermodynamic(format!("batch item {i} failed: {m}")));
                    }
                    Err(e) => return Err(e),
                };
                if let Some(k) = &keys[i] {
                    self.cache.put(k, Value::from(speed));
                }
                speeds[i] = Some(speed);
            }
        }
        speeds.into_iter()
              .map(|s| s.ok_or_else(|| BridgeError::Protocol("batch result incomplete".to_string())))
              .collect()
    }

    fn state_query(&self,
                   function: &str,
                   density: f64,
                   temperature: f64,
                   composition: &str,
                   mechanism: &str)
                   -> BridgeResult<ThermodynamicState> {
        validate_temperature(temperature)?;
        validate_density(density)?;
        let composition = Composition::parse(composition)?;
        if mechanism.trim().is_empty() {
            return Err(BridgeError::InvalidInput("Mechanism identifier must not be empty".to_string()));
        }
        debug!("{function} at rho={density} kg/m³, T={temperature} K");
        let payload = protocol::state_payload(density, temperature, &composition.to_cantera_string(), mechanism.trim());
        let result = self.call(function, &payload)?;
        Ok(ThermodynamicState::from_result(&result)?)
    }
}

/// Extrae `cj_speed` y comprueba que sea físicamente plausible.
fn checked_cj_speed(result: &Value) -> BridgeResult<f64> {
    let speed = number_field(result, "cj_speed")?;
    validate_wave_speed(speed).map_err(|_| {
                                  BridgeError::Protocol(format!("CJ speed out of physical bounds: {speed} m/s"))
                              })?;
    Ok(speed)
}
