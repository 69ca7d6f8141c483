//! Config Validation - gatekeeper for every start/restart command
//! ================================================================
//!
//! User input arrives as three loosely-typed text fields. Nothing reaches the
//! backend until all three parse to strictly positive integers; the result is
//! a [`SimulationConfig`] whose fields cannot be zero.
//!
//! No upper bound is enforced here. The backend is free to reject values it
//! considers unreasonable.

use dispatch_env::SimulationConfig;
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;

/// The fixed message shown to the user when validation fails.
pub const INVALID_CONFIG_MESSAGE: &str =
    "Please enter positive integers for points, hospitals and ambulances";

// =============================================================================
// INPUT FORM
// =============================================================================

/// Configuration fields the user fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    Points,
    Hospitals,
    Ambulances,
}

impl ConfigField {
    pub const ALL: [ConfigField; 3] = [
        ConfigField::Points,
        ConfigField::Hospitals,
        ConfigField::Ambulances,
    ];

    /// Returns the field name as used on the wire and in commands.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigField::Points => "points",
            ConfigField::Hospitals => "hospitals",
            ConfigField::Ambulances => "ambulances",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ConfigField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "points" | "point" | "p" => Ok(ConfigField::Points),
            "hospitals" | "hospital" | "h" => Ok(ConfigField::Hospitals),
            "ambulances" | "ambulance" | "a" => Ok(ConfigField::Ambulances),
            _ => Err(format!("Unknown config field: {}", s)),
        }
    }
}

/// Raw, unvalidated configuration as typed by the user.
///
/// Each field is optional text; an empty string counts as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigInput {
    pub points: Option<String>,
    pub hospitals: Option<String>,
    pub ambulances: Option<String>,
}

impl ConfigInput {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fully filled form from integer counts.
    pub fn from_counts(points: i64, hospitals: i64, ambulances: i64) -> Self {
        Self {
            points: Some(points.to_string()),
            hospitals: Some(hospitals.to_string()),
            ambulances: Some(ambulances.to_string()),
        }
    }

    /// Sets one field, replacing any previous value.
    pub fn set(&mut self, field: ConfigField, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            ConfigField::Points => self.points = value,
            ConfigField::Hospitals => self.hospitals = value,
            ConfigField::Ambulances => self.ambulances = value,
        }
    }

    /// Builder-style variant of [`ConfigInput::set`].
    pub fn with(mut self, field: ConfigField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Returns the raw value of one field.
    pub fn get(&self, field: ConfigField) -> Option<&str> {
        match field {
            ConfigField::Points => self.points.as_deref(),
            ConfigField::Hospitals => self.hospitals.as_deref(),
            ConfigField::Ambulances => self.ambulances.as_deref(),
        }
    }

    /// Validates the form as a unit.
    pub fn validate(&self) -> Result<SimulationConfig, ValidationError> {
        validate(self)
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Why a configuration was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(ConfigField),

    #[error("{field} must be an integer, got {value:?}")]
    NotAnInteger { field: ConfigField, value: String },

    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: ConfigField, value: i64 },

    /// Larger than the client can represent (u32)
    #[error("{field} is out of range: {value}")]
    OutOfRange { field: ConfigField, value: i64 },
}

impl ValidationError {
    /// The field that failed.
    pub fn field(&self) -> ConfigField {
        match self {
            ValidationError::Missing(field) => *field,
            ValidationError::NotAnInteger { field, .. } => *field,
            ValidationError::NotPositive { field, .. } => *field,
            ValidationError::OutOfRange { field, .. } => *field,
        }
    }

    /// Message surfaced in the status log (fixed, independent of the field).
    pub fn user_message(&self) -> &'static str {
        INVALID_CONFIG_MESSAGE
    }
}

/// Validates `input`, checking fields in `points, hospitals, ambulances` order.
///
/// Pure: no I/O, no logging.
pub fn validate(input: &ConfigInput) -> Result<SimulationConfig, ValidationError> {
    let points = parse_positive(ConfigField::Points, input.get(ConfigField::Points))?;
    let hospitals = parse_positive(ConfigField::Hospitals, input.get(ConfigField::Hospitals))?;
    let ambulances = parse_positive(ConfigField::Ambulances, input.get(ConfigField::Ambulances))?;

    Ok(SimulationConfig {
        points,
        hospitals,
        ambulances,
    })
}

fn parse_positive(field: ConfigField, raw: Option<&str>) -> Result<NonZeroU32, ValidationError> {
    let text = match raw.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return Err(ValidationError::Missing(field)),
    };

    let value: i64 = text.parse().map_err(|_| ValidationError::NotAnInteger {
        field,
        value: text.to_string(),
    })?;

    if value <= 0 {
        return Err(ValidationError::NotPositive { field, value });
    }

    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(ValidationError::OutOfRange { field, value })
}

// =============================================================================
// TESTS
// =============================================================================
