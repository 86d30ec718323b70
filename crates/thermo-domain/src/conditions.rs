use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bounds::{validate_inputs, validate_physical_bounds};
use crate::{Composition, DomainError};

/// Condiciones iniciales de un cálculo. Inmutable: sólo se construye a través
/// de los constructores, que aplican el validador de límites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConditions")]
pub struct InitialConditions {
    pressure: f64,
    temperature: f64,
    composition: Composition,
    mechanism: String,
}

#[derive(Deserialize)]
struct RawConditions {
    pressure: f64,
    temperature: f64,
    composition: String,
    mechanism: String,
}

impl TryFrom<RawConditions> for InitialConditions {
    type Error = DomainError;
    fn try_from(raw: RawConditions) -> Result<Self, Self::Error> {
        InitialConditions::new(raw.pressure, raw.temperature, &raw.composition, &raw.mechanism)
    }
}

impl InitialConditions {
    pub fn new(pressure: f64, temperature: f64, composition: &str, mechanism: &str) -> Result<Self, DomainError> {
        let composition = validate_inputs(pressure, temperature, composition)?;
        Self::from_parts(pressure, temperature, composition, mechanism)
    }

    pub fn from_parts(pressure: f64, temperature: f64, composition: Composition, mechanism: &str) -> Result<Self, DomainError> {
        validate_physical_bounds(pressure, temperature)?;
        let mechanism = mechanism.trim();
        if mechanism.is_empty() {
            return Err(DomainError::ValidationError("Mechanism identifier must not be empty".to_string()));
        }
        Ok(Self { pressure,
                  temperature,
                  composition,
                  mechanism: mechanism.to_string() })
    }

    pub fn pressure(&self) -> f64 { self.pressure }
    pub fn temperature(&self) -> f64 { self.temperature }
    pub fn composition(&self) -> &Composition { &self.composition }
    pub fn mechanism(&self) -> &str { &self.mechanism }
}

impl fmt::Display for InitialConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} at {} Pa, {} K, {}>", self.composition, self.pressure, self.temperature, self.mechanism)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_valid_conditions() {
        let ic = InitialConditions::new(101_325.0, 300.0, "H2:2 O2:1 N2:3.76", "h2.yaml").unwrap();
        assert_eq!(ic.pressure(), 101_325.0);
        assert_eq!(ic.composition().len(), 3);
        assert_eq!(ic.mechanism(), "h2.yaml");
    }

    #[test]
    fn rejects_empty_mechanism_and_bad_bounds() {
        assert!(InitialConditions::new(101_325.0, 300.0, "H2:2", "  ").is_err());
        assert!(InitialConditions::new(10.0, 300.0, "H2:2", "m").is_err());
    }

    #[test]
    fn deserialization_goes_through_validation() {
        let ok: InitialConditions = serde_json::from_value(json!({
            "pressure": 101325.0, "temperature": 300.0, "composition": "H2:2 O2:1", "mechanism": "m.yaml"
        })).unwrap();
        assert_eq!(ok.composition().to_cantera_string(), "H2:2 O2:1");
        let bad = serde_json::from_value::<InitialConditions>(json!({
            "pressure": 1.0, "temperature": 300.0, "composition": "H2:2", "mechanism": "m.yaml"
        }));
        assert!(bad.is_err());
    }
}
