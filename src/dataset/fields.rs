//! Fields tracked by a dataset.

use std::fmt;

use crate::interpolation::Placement;

/// What a field is used for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Eastward velocity (m/s) on u points.
    U,
    /// Northward velocity (m/s) on v points.
    V,
    /// Free-surface elevation (m), used for the vertical velocity.
    Zeta,
    /// Potential temperature (°C).
    Temperature,
    /// Salinity (PSU).
    Salinity,
    /// Vertical diffusivity (m²/s) on w levels.
    Kv,
    /// Any other tracer, queried by name.
    Tracer(String),
}

impl FieldRole {
    /// Key the field is stored and queried under.
    pub fn key(&self) -> &str {
        match self {
            Self::U => "u",
            Self::V => "v",
            Self::Zeta => "zeta",
            Self::Temperature => "temperature",
            Self::Salinity => "salinity",
            Self::Kv => "kv",
            Self::Tracer(name) => name,
        }
    }

    /// Staggered placement of the field.
    pub fn placement(&self) -> Placement {
        match self {
            Self::U => Placement::EastFace,
            Self::V => Placement::NorthFace,
            Self::Kv => Placement::TopFace,
            _ => Placement::Center,
        }
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A field read from the archives at every record.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub role: FieldRole,
    /// Variable name in the archive.
    pub variable: String,
    /// Setup fails when a required field is absent; optional fields are
    /// disabled and read as NaN.
    pub required: bool,
    /// Filename pattern of the archives holding the field, when it is not
    /// stored with the velocities (NEMO `grid_T` files).
    pub pattern: Option<String>,
}

impl FieldSpec {
    pub fn required(role: FieldRole, variable: impl Into<String>) -> Self {
        Self {
            role,
            variable: variable.into(),
            required: true,
            pattern: None,
        }
    }

    pub fn optional(role: FieldRole, variable: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(role, variable)
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn key(&self) -> &str {
        self.role.key()
    }
}
