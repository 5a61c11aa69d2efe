//! Archives stored as files in a directory.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use super::{matches_pattern, Archive, ArchiveError, ArchiveSource};

/// Lists archive files in one directory by wildcard pattern.
///
/// Opening requires the `netcdf` feature; without it [`open`](ArchiveSource::open)
/// fails with [`ArchiveError::FeatureDisabled`].
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArchiveSource for DirectorySource {
    fn list(&self, pattern: &str) -> Result<Vec<String>, ArchiveError> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if matches_pattern(pattern, &name) {
                found.push(entry.path().to_string_lossy().into_owned());
            }
        }
        found.sort();
        debug!(
            "{} file(s) matching '{}' in {}",
            found.len(),
            pattern,
            self.root.display()
        );
        Ok(found)
    }

    #[cfg(feature = "netcdf")]
    fn open(&self, location: &str) -> Result<Box<dyn Archive>, ArchiveError> {
        let path = Path::new(location);
        if !path.exists() {
            return Err(ArchiveError::NotFound(location.to_string()));
        }
        Ok(Box::new(super::NetcdfArchive::open(path)?))
    }

    #[cfg(not(feature = "netcdf"))]
    fn open(&self, location: &str) -> Result<Box<dyn Archive>, ArchiveError> {
        if !Path::new(location).exists() {
            return Err(ArchiveError::NotFound(location.to_string()));
        }
        Err(ArchiveError::FeatureDisabled(location.to_string()))
    }
}
