//! Archive access for ocean-model output.
//!
//! The numerical core never talks to a file format directly. It consumes two
//! small capabilities:
//!
//! - [`Archive`]: one opened archive (a NetCDF file, an in-memory stand-in),
//!   able to report dimension lengths and variable shapes, read a
//!   hyperslab of a named variable and look up attributes.
//! - [`ArchiveSource`]: lists candidate archives matching a filename pattern
//!   and opens them.
//!
//! Implementations:
//! - [`MemoryArchive`] / [`MemorySource`]: in-memory archives for tests,
//!   benches and synthetic scenarios.
//! - [`DirectorySource`]: wildcard listing of a directory; archives are
//!   opened through [`NetcdfArchive`] (requires the `netcdf` feature).
//!
//! # Data Layout
//!
//! Regions are returned row-major (last dimension fastest), already
//! unpacked with `scale_factor`/`add_offset`, with fill values mapped to NaN.
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::io::{Archive, ArchiveSource, MemoryArchive, MemorySource};
//!
//! let archive = MemoryArchive::new("roms_his_0001.nc")
//!     .with_dimension("ocean_time", 2)
//!     .with_variable("ocean_time", &[2], vec![0.0, 3600.0]);
//!
//! let mut source = MemorySource::new();
//! source.insert(archive);
//!
//! let files = source.list("roms_his_*.nc").unwrap();
//! let handle = source.open(&files[0]).unwrap();
//! assert_eq!(handle.dimension_len("ocean_time").unwrap(), 2);
//! ```

mod directory;
mod memory;
#[cfg(feature = "netcdf")]
mod netcdf_io;
mod pattern;

pub use directory::DirectorySource;
pub use memory::{MemoryArchive, MemorySource};
#[cfg(feature = "netcdf")]
pub use netcdf_io::NetcdfArchive;
pub use pattern::{is_pattern, matches_pattern};

use std::fmt;

use thiserror::Error;

/// Error type for archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// NetCDF library error
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// Archive could not be located
    #[error("archive not found: {0}")]
    NotFound(String),

    /// Invalid data
    #[error("invalid data in {location}: {reason}")]
    InvalidData { location: String, reason: String },

    /// Missing variable
    #[error("missing variable '{variable}' in {location}")]
    MissingVariable { variable: String, location: String },

    /// Missing dimension
    #[error("missing dimension '{dimension}' in {location}")]
    MissingDimension { dimension: String, location: String },

    /// Missing attribute
    #[error("missing attribute '{attribute}' in {location}")]
    MissingAttribute { attribute: String, location: String },

    /// Requested hyperslab exceeds the variable shape
    #[error("region {origin:?}+{shape:?} outside variable '{variable}' of shape {actual:?}")]
    RegionOutOfBounds {
        variable: String,
        origin: Vec<usize>,
        shape: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Feature not enabled
    #[error("NetCDF feature not enabled, cannot open {0}")]
    FeatureDisabled(String),
}

/// Attribute value as seen by the core.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
}

impl AttributeValue {
    /// Scalar value, or the first element of a numeric array.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Numbers(v) => v.first().copied(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Numeric values as a vector.
    pub fn as_vec(&self) -> Option<Vec<f64>> {
        match self {
            Self::Number(v) => Some(vec![*v]),
            Self::Numbers(v) => Some(v.clone()),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Fill value for missing data (CF-conventions standard).
pub const FILL_VALUE_F64: f64 = 9.96920996838687e+36;

/// Check if a value is valid (not a fill value).
#[inline]
pub fn is_valid_f64(v: f64) -> bool {
    v.is_finite() && v.abs() < 1.0e+30
}

/// One opened archive.
pub trait Archive: Send + Sync {
    /// Path or name identifying the archive in messages.
    fn location(&self) -> &str;

    /// Length of a named dimension.
    fn dimension_len(&self, name: &str) -> Result<usize, ArchiveError>;

    /// Whether a variable exists.
    fn has_variable(&self, name: &str) -> bool;

    /// Shape of a variable, outermost dimension first.
    fn variable_shape(&self, name: &str) -> Result<Vec<usize>, ArchiveError>;

    /// Read the hyperslab `origin .. origin + shape` of a variable.
    fn read_region(
        &self,
        name: &str,
        origin: &[usize],
        shape: &[usize],
    ) -> Result<Vec<f64>, ArchiveError>;

    /// Global attribute.
    fn global_attribute(&self, name: &str) -> Option<AttributeValue>;

    /// Attribute attached to a variable.
    fn variable_attribute(&self, variable: &str, name: &str) -> Option<AttributeValue>;

    /// Read a whole variable.
    fn read_all(&self, name: &str) -> Result<Vec<f64>, ArchiveError> {
        let shape = self.variable_shape(name)?;
        let origin = vec![0; shape.len()];
        self.read_region(name, &origin, &shape)
    }

    /// Numeric parameter stored either as a global attribute or as a variable.
    ///
    /// The attribute wins when both exist (UCLA files store `hc`, `Cs_r`,
    /// `Cs_w` as attributes, Rutgers files as variables).
    fn global_or_variable(&self, name: &str) -> Option<Vec<f64>> {
        if let Some(values) = self.global_attribute(name).and_then(|a| a.as_vec()) {
            return Some(values);
        }
        if self.has_variable(name) {
            return self.read_all(name).ok();
        }
        None
    }

    /// Missing-variable error for this archive.
    fn missing(&self, variable: &str) -> ArchiveError {
        ArchiveError::MissingVariable {
            variable: variable.to_string(),
            location: self.location().to_string(),
        }
    }
}

impl fmt::Debug for dyn Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Archive({})", self.location())
    }
}

/// Lists and opens archives.
pub trait ArchiveSource: Send + Sync {
    /// Archives whose name matches a wildcard pattern (`*`, `?`), sorted by name.
    fn list(&self, pattern: &str) -> Result<Vec<String>, ArchiveError>;

    /// Open an archive previously returned by [`list`](Self::list).
    fn open(&self, location: &str) -> Result<Box<dyn Archive>, ArchiveError>;
}

impl fmt::Debug for dyn ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArchiveSource")
    }
}

/// Number of elements of a region.
pub(crate) fn region_len(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Validate a hyperslab against a variable shape.
pub(crate) fn check_region(
    variable: &str,
    origin: &[usize],
    shape: &[usize],
    actual: &[usize],
) -> Result<(), ArchiveError> {
    let fits = origin.len() == actual.len()
        && shape.len() == actual.len()
        && origin
            .iter()
            .zip(shape)
            .zip(actual)
            .all(|((&o, &s), &a)| o + s <= a);
    if fits {
        Ok(())
    } else {
        Err(ArchiveError::RegionOutOfBounds {
            variable: variable.to_string(),
            origin: origin.to_vec(),
            shape: shape.to_vec(),
            actual: actual.to_vec(),
        })
    }
}
