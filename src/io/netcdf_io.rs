//! NetCDF archive access.
//!
//! Reads ROMS, NEMO and regular-grid model output through the NetCDF C
//! library. Packed variables are unpacked with `scale_factor`/`add_offset`
//! and fill values become NaN, so the numerical core only ever sees plain
//! `f64` arrays.
//!
//! # Example
//!
//! ```rust,ignore
//! use ichthyop_rs::io::{Archive, NetcdfArchive};
//!
//! let archive = NetcdfArchive::open("roms_avg_0001.nc")?;
//! let nx = archive.dimension_len("xi_rho")?;
//! let h = archive.read_all("h")?;
//! ```

use std::ops::Range;
use std::path::Path;
use std::sync::Mutex;

use log::info;

use super::{check_region, is_valid_f64, Archive, ArchiveError, AttributeValue};

/// An opened NetCDF file.
///
/// The handle is guarded by a mutex so that the archive can be shared with
/// read-only particle workers even though reads only happen during the
/// single-threaded advance phase.
pub struct NetcdfArchive {
    location: String,
    file: Mutex<netcdf::File>,
}

impl NetcdfArchive {
    /// Open a NetCDF file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let location = path.as_ref().to_string_lossy().into_owned();
        let file = netcdf::open(path)?;
        info!("Opened archive {}", location);
        Ok(Self {
            location,
            file: Mutex::new(file),
        })
    }

    fn with_file<T>(&self, f: impl FnOnce(&netcdf::File) -> T) -> Result<T, ArchiveError> {
        let guard = self.file.lock().map_err(|_| ArchiveError::InvalidData {
            location: self.location.clone(),
            reason: "archive handle poisoned".to_string(),
        })?;
        Ok(f(&guard))
    }

    /// Convert a NetCDF attribute value.
    fn convert(value: netcdf::AttributeValue) -> Option<AttributeValue> {
        use netcdf::AttributeValue as A;
        Some(match value {
            A::Double(d) => AttributeValue::Number(d),
            A::Float(f) => AttributeValue::Number(f as f64),
            A::Int(i) => AttributeValue::Number(i as f64),
            A::Short(s) => AttributeValue::Number(s as f64),
            A::Schar(b) => AttributeValue::Number(b as f64),
            A::Uchar(b) => AttributeValue::Number(b as f64),
            A::Doubles(v) => AttributeValue::Numbers(v),
            A::Floats(v) => AttributeValue::Numbers(v.into_iter().map(f64::from).collect()),
            A::Ints(v) => AttributeValue::Numbers(v.into_iter().map(f64::from).collect()),
            A::Shorts(v) => AttributeValue::Numbers(v.into_iter().map(f64::from).collect()),
            A::Str(s) => AttributeValue::Text(s),
            _ => return None,
        })
    }

    /// Get f64 attribute value of a variable.
    fn attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
        var.attribute_value(name)
            .and_then(|r| r.ok())
            .and_then(Self::convert)
            .and_then(|v| v.as_f64())
    }
}

impl Archive for NetcdfArchive {
    fn location(&self) -> &str {
        &self.location
    }

    fn dimension_len(&self, name: &str) -> Result<usize, ArchiveError> {
        self.with_file(|f| f.dimension(name).map(|d| d.len()))?
            .ok_or_else(|| ArchiveError::MissingDimension {
                dimension: name.to_string(),
                location: self.location.clone(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.with_file(|f| f.variable(name).is_some())
            .unwrap_or(false)
    }

    fn variable_shape(&self, name: &str) -> Result<Vec<usize>, ArchiveError> {
        self.with_file(|f| {
            f.variable(name)
                .map(|v| v.dimensions().iter().map(|d| d.len()).collect::<Vec<_>>())
        })?
        .ok_or_else(|| self.missing(name))
    }

    fn read_region(
        &self,
        name: &str,
        origin: &[usize],
        shape: &[usize],
    ) -> Result<Vec<f64>, ArchiveError> {
        let actual = self.variable_shape(name)?;
        check_region(name, origin, shape, &actual)?;

        let result = self.with_file(|f| -> Result<Vec<f64>, ArchiveError> {
            let var = f.variable(name).ok_or_else(|| self.missing(name))?;
            let scale = Self::attr_f64(&var, "scale_factor").unwrap_or(1.0);
            let offset = Self::attr_f64(&var, "add_offset").unwrap_or(0.0);
            let fill = Self::attr_f64(&var, "_FillValue");

            let extents: Vec<Range<usize>> = origin
                .iter()
                .zip(shape)
                .map(|(&o, &s)| o..o + s)
                .collect();
            let raw: Vec<f64> = var.get_values::<f64, _>(extents.as_slice())?;

            Ok(raw
                .into_iter()
                .map(|v| {
                    let is_fill = fill.map_or(false, |fv| v == fv);
                    if is_fill || !is_valid_f64(v) {
                        f64::NAN
                    } else {
                        v * scale + offset
                    }
                })
                .collect())
        })?;
        result
    }

    fn global_attribute(&self, name: &str) -> Option<AttributeValue> {
        self.with_file(|f| {
            f.attribute(name)
                .and_then(|a| a.value().ok())
                .and_then(Self::convert)
        })
        .ok()
        .flatten()
    }

    fn variable_attribute(&self, variable: &str, name: &str) -> Option<AttributeValue> {
        self.with_file(|f| {
            f.variable(variable)
                .and_then(|v| v.attribute_value(name))
                .and_then(|r| r.ok())
                .and_then(Self::convert)
        })
        .ok()
        .flatten()
    }
}
