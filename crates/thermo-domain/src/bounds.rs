//! Validador de límites físicos.
//!
//! Se ejecuta antes de cualquier consulta a caché o lanzamiento de proceso:
//! una petición que no pasa por aquí nunca ensucia la caché ni consume un
//! lanzamiento del toolkit externo. No tiene efectos secundarios.
use crate::{Composition, DomainError};

/// 1 kPa.
pub const MIN_PRESSURE: f64 = 1.0e3;
/// 100 MPa.
pub const MAX_PRESSURE: f64 = 1.0e8;
pub const MIN_TEMPERATURE: f64 = 200.0;
pub const MAX_TEMPERATURE: f64 = 6000.0;
/// Límite superior para velocidades de choque y CJ [m/s].
pub const MAX_WAVE_SPEED: f64 = 10_000.0;
/// Límite superior de densidad para cálculos de estado [kg/m³].
pub const MAX_DENSITY: f64 = 1000.0;

pub fn validate_physical_bounds(pressure: f64, temperature: f64) -> Result<(), DomainError> {
    if !pressure.is_finite() || !(MIN_PRESSURE..=MAX_PRESSURE).contains(&pressure) {
        return Err(DomainError::ValidationError(format!(
            "Pressure out of bounds: {pressure} Pa (valid range: {MIN_PRESSURE} - {MAX_PRESSURE} Pa)"
        )));
    }
    validate_temperature(temperature)
}

pub fn validate_temperature(temperature: f64) -> Result<(), DomainError> {
    if !temperature.is_finite() || !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(DomainError::ValidationError(format!(
            "Temperature out of bounds: {temperature} K (valid range: {MIN_TEMPERATURE} - {MAX_TEMPERATURE} K)"
        )));
    }
    Ok(())
}

/// Valida presión, temperatura y composición; devuelve la composición parseada.
pub fn validate_inputs(pressure: f64, temperature: f64, composition: &str) -> Result<Composition, DomainError> {
    validate_physical_bounds(pressure, temperature)?;
    Composition::parse(composition)
}

pub fn validate_wave_speed(speed: f64) -> Result<(), DomainError> {
    if !speed.is_finite() || speed <= 0.0 || speed > MAX_WAVE_SPEED {
        return Err(DomainError::ValidationError(format!("Shock speed out of bounds: {speed} m/s")));
    }
    Ok(())
}

pub fn validate_density(density: f64) -> Result<(), DomainError> {
    if !density.is_finite() || density <= 0.0 || density > MAX_DENSITY {
        return Err(DomainError::ValidationError(format!("Density out of bounds: {density} kg/m³")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_standard_conditions() {
        assert!(validate_physical_bounds(101_325.0, 300.0).is_ok());
        assert!(validate_physical_bounds(MIN_PRESSURE, MIN_TEMPERATURE).is_ok());
        assert!(validate_physical_bounds(MAX_PRESSURE, MAX_TEMPERATURE).is_ok());
    }

    #[test]
    fn rejects_out_of_envelope() {
        assert!(validate_physical_bounds(999.0, 300.0).is_err());
        assert!(validate_physical_bounds(1.1e8, 300.0).is_err());
        assert!(validate_physical_bounds(101_325.0, 199.0).is_err());
        assert!(validate_physical_bounds(101_325.0, 6001.0).is_err());
        assert!(validate_physical_bounds(f64::NAN, 300.0).is_err());
        assert!(validate_physical_bounds(101_325.0, f64::INFINITY).is_err());
    }

    #[test]
    fn error_message_names_the_range() {
        let err = validate_physical_bounds(10.0, 300.0).unwrap_err();
        assert!(err.to_string().starts_with("Pressure out of bounds: 10 Pa"));
    }

    #[test]
    fn validate_inputs_checks_composition() {
        assert!(validate_inputs(101_325.0, 300.0, "H2:2 O2:1").is_ok());
        assert!(validate_inputs(101_325.0, 300.0, "nonsense").is_err());
    }

    #[test]
    fn wave_speed_and_density_limits() {
        assert!(validate_wave_speed(2000.0).is_ok());
        assert!(validate_wave_speed(0.0).is_err());
        assert!(validate_wave_speed(10_001.0).is_err());
        assert!(validate_density(1.2).is_ok());
        assert!(validate_density(-1.0).is_err());
        assert!(validate_density(1000.1).is_err());
    }
}
