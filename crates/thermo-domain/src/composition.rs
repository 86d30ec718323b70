//! Composición de mezclas en formato Cantera (`"H2:2 O2:1 N2:3.76"`).
//!
//! La composición conserva el orden en que el usuario escribió las especies
//! (es lo que se envía al toolkit), pero expone una forma normalizada con las
//! especies ordenadas para derivar claves de caché estables.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::DomainError;

/// Mapeo especie -> cantidad relativa (no negativa, finita, al menos una).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Composition {
    species: IndexMap<String, f64>,
}

impl Composition {
    /// Parsea un string Cantera. Acepta espacios y/o comas como separadores.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let mut species = IndexMap::new();
        for token in input.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()) {
            let (name, amount) = token
                .split_once(':')
                .ok_or_else(|| DomainError::ValidationError(format!("Invalid composition format: {input}")))?;
            let name = name.trim();
            if name.is_empty() || !name.chars().all(is_species_char) {
                return Err(DomainError::ValidationError(format!("Invalid species name '{name}' in composition: {input}")));
            }
            let value: f64 = amount
                .trim()
                .parse()
                .map_err(|_| DomainError::ValidationError(format!("Invalid amount '{amount}' for species {name}")))?;
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::ValidationError(format!("Amount for species {name} must be finite and non-negative, got {value}")));
            }
            if species.insert(name.to_string(), value).is_some() {
                return Err(DomainError::ValidationError(format!("Duplicate species {name} in composition: {input}")));
            }
        }
        Self::from_map(species).map_err(|_| DomainError::ValidationError(format!("Invalid composition format: {input}")))
    }

    /// Construye desde un mapa ya separado, aplicando las mismas reglas.
    pub fn from_map(species: IndexMap<String, f64>) -> Result<Self, DomainError> {
        if species.is_empty() {
            return Err(DomainError::ValidationError("Composition must contain at least one species".to_string()));
        }
        if species.values().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(DomainError::ValidationError("Composition amounts must be finite and non-negative".to_string()));
        }
        Ok(Self { species })
    }

    /// Mezcla estequiométrica escalada por la razón de equivalencia.
    ///
    /// Combustibles soportados: `H2`/`hydrogen` y `CH4`/`methane`; oxidantes
    /// `air` u `O2`.
    pub fn for_fuel(fuel: &str, equivalence_ratio: f64, oxidizer: &str) -> Result<Self, DomainError> {
        if !equivalence_ratio.is_finite() || equivalence_ratio <= 0.0 {
            return Err(DomainError::ValidationError(format!("Equivalence ratio must be positive, got {equivalence_ratio}")));
        }
        let mut species = IndexMap::new();
        match (fuel, oxidizer) {
            ("H2" | "hydrogen", "air") => {
                species.insert("H2".to_string(), 2.0 * equivalence_ratio);
                species.insert("O2".to_string(), 1.0);
                species.insert("N2".to_string(), 3.76);
            }
            ("H2" | "hydrogen", "O2") => {
                species.insert("H2".to_string(), 2.0 * equivalence_ratio);
                species.insert("O2".to_string(), 1.0);
            }
            ("CH4" | "methane", "air") => {
                species.insert("CH4".to_string(), equivalence_ratio);
                species.insert("O2".to_string(), 2.0);
                species.insert("N2".to_string(), 7.52);
            }
            ("CH4" | "methane", "O2") => {
                species.insert("CH4".to_string(), equivalence_ratio);
                species.insert("O2".to_string(), 2.0);
            }
            _ => {
                return Err(DomainError::ValidationError(format!("Unsupported fuel/oxidizer combination: {fuel}/{oxidizer}")));
            }
        }
        Self::from_map(species)
    }

    pub fn species(&self) -> &IndexMap<String, f64> { &self.species }
    pub fn len(&self) -> usize { self.species.len() }
    pub fn is_empty(&self) -> bool { self.species.is_empty() }
    pub fn amount(&self, name: &str) -> Option<f64> { self.species.get(name).copied() }

    /// Forma enviada al toolkit: orden original, un espacio entre pares.
    pub fn to_cantera_string(&self) -> String {
        self.species
            .iter()
            .map(|(name, amount)| format!("{name}:{amount}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Forma canónica para claves de caché: especies ordenadas y cantidades con
    /// precisión fija, de modo que `"O2:1 H2:2"` y `"H2:2.0  O2:1"` coinciden.
    pub fn normalized(&self) -> String {
        let sorted: BTreeMap<&str, f64> = self.species.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        sorted
            .into_iter()
            .map(|(name, amount)| format!("{name}:{amount:.6}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Fracciones molares (la suma es 1). Una mezcla con todas las cantidades
    /// en cero da fracciones cero.
    pub fn mole_fractions(&self) -> BTreeMap<String, f64> {
        let total: f64 = self.species.values().sum();
        self.species
            .iter()
            .map(|(k, v)| (k.clone(), if total > 0.0 { v / total } else { 0.0 }))
            .collect()
    }
}

fn is_species_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '(' | ')' | '+' | '*')
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_cantera_string())
    }
}

impl TryFrom<String> for Composition {
    type Error = DomainError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Composition::parse(&value) }
}

impl From<Composition> for String {
    fn from(value: Composition) -> Self { value.to_cantera_string() }
}
