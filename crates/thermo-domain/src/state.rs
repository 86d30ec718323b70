//! Estado termodinámico devuelto por el toolkit externo.
//!
//! Sólo se construye a partir de una respuesta ya validada; el invariante
//! `pressure, temperature, density > 0` se comprueba al deserializar, de modo
//! que no existe un `ThermodynamicState` físicamente imposible en memoria.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawState")]
pub struct ThermodynamicState {
    pressure: f64,
    temperature: f64,
    density: f64,
    enthalpy: f64,
    entropy: f64,
    sound_speed: f64,
    mean_molecular_weight: f64,
    cp: f64,
    cv: f64,
    composition: BTreeMap<String, f64>,
}

#[derive(Deserialize)]
struct RawState {
    pressure: f64,
    temperature: f64,
    density: f64,
    enthalpy: f64,
    entropy: f64,
    #[serde(default)]
    sound_speed: f64,
    #[serde(default)]
    mean_molecular_weight: f64,
    #[serde(default)]
    cp: f64,
    #[serde(default)]
    cv: f64,
    #[serde(default)]
    composition: BTreeMap<String, f64>,
}

impl TryFrom<RawState> for ThermodynamicState {
    type Error = DomainError;
    fn try_from(raw: RawState) -> Result<Self, Self::Error> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(raw.pressure) && positive(raw.temperature) && positive(raw.density)) {
            return Err(DomainError::InvariantViolation(format!(
                "Invalid thermodynamic state calculated (P={} Pa, T={} K, rho={} kg/m³)",
                raw.pressure, raw.temperature, raw.density
            )));
        }
        Ok(Self { pressure: raw.pressure,
                  temperature: raw.temperature,
                  density: raw.density,
                  enthalpy: raw.enthalpy,
                  entropy: raw.entropy,
                  sound_speed: raw.sound_speed,
                  mean_molecular_weight: raw.mean_molecular_weight,
                  cp: raw.cp,
                  cv: raw.cv,
                  composition: raw.composition })
    }
}

impl ThermodynamicState {
    /// Construye el estado desde el objeto `result` de una respuesta del toolkit.
    pub fn from_result(result: &Value) -> Result<Self, DomainError> {
        // dos pasos: campos ausentes o mal tipados → SerializationError;
        // estado físicamente imposible → InvariantViolation
        let raw: RawState = serde_json::from_value(result.clone())?;
        Self::try_from(raw)
    }

    pub fn pressure(&self) -> f64 { self.pressure }
    pub fn temperature(&self) -> f64 { self.temperature }
    pub fn density(&self) -> f64 { self.density }
    pub fn enthalpy(&self) -> f64 { self.enthalpy }
    pub fn entropy(&self) -> f64 { self.entropy }
    pub fn sound_speed(&self) -> f64 { self.sound_speed }
    pub fn mean_molecular_weight(&self) -> f64 { self.mean_molecular_weight }
    pub fn cp(&self) -> f64 { self.cp }
    pub fn cv(&self) -> f64 { self.cv }
    pub fn composition(&self) -> &BTreeMap<String, f64> { &self.composition }

    /// Relación de calores específicos; `None` si el toolkit no reportó cv.
    pub fn gamma(&self) -> Option<f64> {
        (self.cv > 0.0).then(|| self.cp / self.cv)
    }
}

/// Residuos de las ecuaciones de conservación a través de una onda (FH, FP).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConservationErrors {
    pub enthalpy_error: f64,
    pub pressure_error: f64,
}

impl ConservationErrors {
    /// Evalúa energía y cantidad de movimiento entre el estado 1 (sin chocar)
    /// y el estado 2 para una velocidad de onda dada.
    pub fn between(wave_speed: f64, state1: &ThermodynamicState, state2: &ThermodynamicState) -> Self {
        let (p1, h1, r1) = (state1.pressure, state1.enthalpy, state1.density);
        let (p2, h2, r2) = (state2.pressure, state2.enthalpy, state2.density);
        let w1s = wave_speed * wave_speed;
        let w2s = w1s * (r1 / r2) * (r1 / r2);
        Self { enthalpy_error: h2 + 0.5 * w2s - (h1 + 0.5 * w1s),
               pressure_error: p2 + r2 * w2s - (p1 + r1 * w1s) }
    }
}
