//! Protocolo JSON con el script puente.
//!
//! Petición: objeto con `function` más los campos propios de cada operación.
//! Respuesta: `{success, result?, errors?, metadata?}`.
use serde::Deserialize;
use serde_json::{json, Map, Value};

use thermo_core::constants::PROTOCOL_VERSION;
use thermo_core::{BridgeError, BridgeResult};
use thermo_domain::{InitialConditions, ThermodynamicState};

pub const FN_CJ_SPEED: &str = "CJspeed";
pub const FN_POST_SHOCK_EQ: &str = "PostShock_eq";
pub const FN_EQ_STATE: &str = "eq_state";
pub const FN_FROZEN_STATE: &str = "state";
pub const FN_SOUND_SPEED_EQ: &str = "soundspeed_eq";
pub const FN_BATCH: &str = "batch";
pub const FN_TEST_CONNECTION: &str = "test_connection";
pub const FN_VALIDATE_MECHANISM: &str = "validate_mechanism";

/// Respuesta cruda del toolkit. `success` es opcional aquí para poder
/// distinguir "ausente" (error de protocolo) de `false`.
#[derive(Debug, Deserialize)]
pub struct Response {
    pub success: Option<bool>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl Response {
    pub fn protocol_version(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("protocol_version")?.as_str()
    }
}

/// Añade `function` al payload.
pub fn envelope(function: &str, payload: &Value) -> Value {
    let mut obj = match payload {
        Value::Object(m) => m.clone(),
        Value::Null => Map::new(),
        other => {
            let mut m = Map::new();
            m.insert("payload".to_string(), other.clone());
            m
        }
    };
    obj.insert("function".to_string(), Value::String(function.to_string()));
    Value::Object(obj)
}

pub fn cj_speed_payload(ic: &InitialConditions) -> Value {
    json!({
        "P1": ic.pressure(),
        "T1": ic.temperature(),
        "q": ic.composition().to_cantera_string(),
        "mech": ic.mechanism(),
        "fullOutput": false,
    })
}

pub fn post_shock_payload(shock_speed: f64, ic: &InitialConditions) -> Value {
    json!({
        "U1": shock_speed,
        "P1": ic.pressure(),
        "T1": ic.temperature(),
        "q": ic.composition().to_cantera_string(),
        "mech": ic.mechanism(),
    })
}

pub fn state_payload(density: f64, temperature: f64, composition: &str, mechanism: &str) -> Value {
    json!({
        "density": density,
        "temperature": temperature,
        "composition": composition,
        "mechanism": mechanism,
    })
}

pub fn sound_speed_payload(state: &ThermodynamicState, mechanism: &str) -> Value {
    json!({
        "pressure": state.pressure(),
        "temperature": state.temperature(),
        "composition": state.composition(),
        "mechanism": mechanism,
    })
}

pub fn batch_payload(requests: Vec<Value>) -> Value { json!({ "requests": requests }) }

/// Parsea stdout del proceso y valida el sobre de respuesta. Devuelve el
/// objeto `result`.
pub fn parse_response(stdout: &str) -> BridgeResult<Value> {
    let body = stdout.trim();
    if body.is_empty() {
        return Err(BridgeError::Process("bridge script produced no output".to_string()));
    }
    let value: Value = serde_json::from_str(body).map_err(|e| {
        BridgeError::Process(format!("failed to parse bridge output as JSON: {e}; output: {}", truncate(body, 200)))
    })?;
    validate_response(value)
}

/// Reglas del sobre: falta `success` → protocolo; `success:false` → error
/// termodinámico con los mensajes unidos; `success:true` sin `result` → protocolo.
/// Un `metadata.protocol_version` distinto del nuestro también es error de
/// protocolo; su ausencia se tolera.
pub fn validate_response(value: Value) -> BridgeResult<Value> {
    if !value.is_object() {
        return Err(BridgeError::Protocol("response is not a JSON object".to_string()));
    }
    let response: Response = serde_json::from_value(value)?;
    if let Some(version) = response.protocol_version() {
        if version != PROTOCOL_VERSION {
            return Err(BridgeError::Protocol(format!("unsupported protocol version {version} (expected {PROTOCOL_VERSION})")));
        }
    }
    match response.success {
        None => Err(BridgeError::Protocol("invalid response format: missing 'success' field".to_string())),
        Some(false) => {
            let detail = if response.errors.is_empty() {
                "toolkit reported failure without details".to_string()
            } else {
                response.errors.join("; ")
            };
            Err(BridgeError::Thermodynamic(detail))
        }
        Some(true) => response.result
                              .ok_or_else(|| BridgeError::Protocol("invalid response format: missing 'result' field".to_string())),
    }
}

/// Extrae un campo numérico finito de `result`.
pub fn number_field(result: &Value, field: &str) -> BridgeResult<f64> {
    result.get(field)
          .and_then(Value::as_f64)
          .filter(|v| v.is_finite())
          .ok_or_else(|| BridgeError::Protocol(format!("result is missing numeric field '{field}'")))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
