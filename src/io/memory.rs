//! In-memory archives.
//!
//! Behave like opened NetCDF files: named dimensions, row-major variables
//! with per-variable attributes, global attributes. Cloning is cheap since
//! variable payloads are shared.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    check_region, matches_pattern, region_len, Archive, ArchiveError, ArchiveSource,
    AttributeValue,
};

#[derive(Clone, Debug)]
struct MemoryVariable {
    shape: Vec<usize>,
    data: Vec<f64>,
    attributes: BTreeMap<String, AttributeValue>,
}

/// Archive held entirely in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryArchive {
    location: String,
    dimensions: BTreeMap<String, usize>,
    variables: BTreeMap<String, Arc<MemoryVariable>>,
    attributes: BTreeMap<String, AttributeValue>,
}

impl MemoryArchive {
    /// Create an empty archive with the given name.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }

    /// Declare a dimension.
    pub fn with_dimension(mut self, name: impl Into<String>, len: usize) -> Self {
        self.dimensions.insert(name.into(), len);
        self
    }

    /// Add a variable. `data` is row-major over `shape`.
    pub fn with_variable(mut self, name: impl Into<String>, shape: &[usize], data: Vec<f64>) -> Self {
        self.variables.insert(
            name.into(),
            Arc::new(MemoryVariable {
                shape: shape.to_vec(),
                data,
                attributes: BTreeMap::new(),
            }),
        );
        self
    }

    /// Attach an attribute to an existing variable.
    ///
    /// Ignored if the variable has not been added yet.
    pub fn with_variable_attribute(
        mut self,
        variable: &str,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Self {
        if let Some(var) = self.variables.get_mut(variable) {
            Arc::make_mut(var).attributes.insert(name.into(), value);
        }
        self
    }

    /// Add a global attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Names of all variables.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(|s| s.as_str())
    }

    fn variable(&self, name: &str) -> Result<&MemoryVariable, ArchiveError> {
        self.variables
            .get(name)
            .map(|v| v.as_ref())
            .ok_or_else(|| self.missing(name))
    }
}

impl Archive for MemoryArchive {
    fn location(&self) -> &str {
        &self.location
    }

    fn dimension_len(&self, name: &str) -> Result<usize, ArchiveError> {
        self.dimensions
            .get(name)
            .copied()
            .ok_or_else(|| ArchiveError::MissingDimension {
                dimension: name.to_string(),
                location: self.location.clone(),
            })
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn variable_shape(&self, name: &str) -> Result<Vec<usize>, ArchiveError> {
        Ok(self.variable(name)?.shape.clone())
    }

    fn read_region(
        &self,
        name: &str,
        origin: &[usize],
        shape: &[usize],
    ) -> Result<Vec<f64>, ArchiveError> {
        let var = self.variable(name)?;
        if var.data.len() != region_len(&var.shape) {
            return Err(ArchiveError::InvalidData {
                location: self.location.clone(),
                reason: format!(
                    "variable '{}' holds {} values for shape {:?}",
                    name,
                    var.data.len(),
                    var.shape
                ),
            });
        }
        check_region(name, origin, shape, &var.shape)?;

        let rank = var.shape.len();
        let mut strides = vec![1usize; rank];
        for d in (0..rank.saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * var.shape[d + 1];
        }

        let n = region_len(shape);
        let mut out = Vec::with_capacity(n);
        let mut index = vec![0usize; rank];
        for _ in 0..n {
            let offset: usize = index
                .iter()
                .zip(origin)
                .zip(&strides)
                .map(|((&i, &o), &s)| (i + o) * s)
                .sum();
            out.push(var.data[offset]);

            // Odometer increment, last dimension fastest.
            for d in (0..rank).rev() {
                index[d] += 1;
                if index[d] < shape[d] {
                    break;
                }
                index[d] = 0;
            }
        }
        Ok(out)
    }

    fn global_attribute(&self, name: &str) -> Option<AttributeValue> {
        self.attributes.get(name).cloned()
    }

    fn variable_attribute(&self, variable: &str, name: &str) -> Option<AttributeValue> {
        self.variables
            .get(variable)
            .and_then(|v| v.attributes.get(name).cloned())
    }
}

/// A set of in-memory archives addressed by name.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    archives: BTreeMap<String, MemoryArchive>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an archive.
    pub fn insert(&mut self, archive: MemoryArchive) {
        self.archives.insert(archive.location.clone(), archive);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_archive(mut self, archive: MemoryArchive) -> Self {
        self.insert(archive);
        self
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }
}

impl ArchiveSource for MemorySource {
    fn list(&self, pattern: &str) -> Result<Vec<String>, ArchiveError> {
        Ok(self
            .archives
            .keys()
            .filter(|name| matches_pattern(pattern, name))
            .cloned()
            .collect())
    }

    fn open(&self, location: &str) -> Result<Box<dyn Archive>, ArchiveError> {
        self.archives
            .get(location)
            .map(|a| Box::new(a.clone()) as Box<dyn Archive>)
            .ok_or_else(|| ArchiveError::NotFound(location.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryArchive {
        // shape [2, 3, 4], value = 100*t + 10*j + i
        let mut data = Vec::new();
        for t in 0..2 {
            for j in 0..3 {
                for i in 0..4 {
                    data.push((100 * t + 10 * j + i) as f64);
                }
            }
        }
        MemoryArchive::new("sample.nc")
            .with_dimension("time", 2)
            .with_variable("temp", &[2, 3, 4], data)
            .with_variable_attribute("temp", "units", AttributeValue::Text("degC".into()))
            .with_attribute("hc", AttributeValue::Number(10.0))
    }

    #[test]
    fn test_read_region_hyperslab() {
        let a = sample();
        let region = a.read_region("temp", &[1, 1, 2], &[1, 2, 2]).unwrap();
        assert_eq!(region, vec![112.0, 113.0, 122.0, 123.0]);
    }

    #[test]
    fn test_read_region_out_of_bounds() {
        let a = sample();
        let err = a.read_region("temp", &[1, 2, 0], &[1, 2, 4]).unwrap_err();
        assert!(matches!(err, ArchiveError::RegionOutOfBounds { .. }));
    }

    #[test]
    fn test_missing_variable_and_dimension() {
        let a = sample();
        assert!(matches!(
            a.read_all("salt").unwrap_err(),
            ArchiveError::MissingVariable { .. }
        ));
        assert!(a.dimension_len("depth").is_err());
    }

    #[test]
    fn test_attributes() {
        let a = sample();
        assert_eq!(
            a.variable_attribute("temp", "units").unwrap().as_text(),
            Some("degC")
        );
        assert_eq!(a.global_or_variable("hc"), Some(vec![10.0]));
        assert_eq!(a.global_or_variable("Cs_r"), None);
    }

    #[test]
    fn test_source_list_and_open() {
        let source = MemorySource::new()
            .with_archive(MemoryArchive::new("avg_0002.nc"))
            .with_archive(MemoryArchive::new("avg_0001.nc"))
            .with_archive(MemoryArchive::new("grid.nc"));
        let files = source.list("avg_*.nc").unwrap();
        assert_eq!(files, vec!["avg_0001.nc", "avg_0002.nc"]);
        assert!(source.open("grid.nc").is_ok());
        assert!(matches!(
            source.open("nope.nc"),
            Err(ArchiveError::NotFound(_))
        ));
    }
}
