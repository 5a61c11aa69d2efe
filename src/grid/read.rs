//! Reading grid variables from archives.
//!
//! Static variables often carry a leading time (or singleton) dimension.
//! These helpers read the innermost 1, 2 or 3 dimensions at index 0 of
//! every leading one.

use super::array::{Array2, Array3};
use super::GridError;
use crate::io::{Archive, ArchiveSource};

fn read_trailing(
    archive: &dyn Archive,
    name: &str,
    rank: usize,
) -> Result<(Vec<usize>, Vec<f64>), GridError> {
    let shape = archive.variable_shape(name)?;
    if shape.len() < rank {
        return Err(GridError::Shape {
            name: name.to_string(),
            expected: vec![0; rank],
            found: shape,
        });
    }
    let lead = shape.len() - rank;
    let origin = vec![0; shape.len()];
    let mut count = shape.clone();
    for c in count.iter_mut().take(lead) {
        *c = 1;
    }
    let data = archive.read_region(name, &origin, &count)?;
    Ok((shape[lead..].to_vec(), data))
}

/// Innermost dimension of a variable.
pub(crate) fn read_axis(archive: &dyn Archive, name: &str) -> Result<Vec<f64>, GridError> {
    Ok(read_trailing(archive, name, 1)?.1)
}

/// Innermost two dimensions of a variable.
pub(crate) fn read_array2(archive: &dyn Archive, name: &str) -> Result<Array2, GridError> {
    let (shape, data) = read_trailing(archive, name, 2)?;
    Array2::from_vec(shape[0], shape[1], data).ok_or_else(|| GridError::Shape {
        name: name.to_string(),
        expected: shape,
        found: vec![],
    })
}

/// Innermost three dimensions of a variable.
pub(crate) fn read_array3(archive: &dyn Archive, name: &str) -> Result<Array3, GridError> {
    let (shape, data) = read_trailing(archive, name, 3)?;
    Array3::from_vec(shape[0], shape[1], shape[2], data).ok_or_else(|| GridError::Shape {
        name: name.to_string(),
        expected: shape,
        found: vec![],
    })
}

/// Check a 2-D array against the tracer grid.
pub(crate) fn expect_shape2(name: &str, a: &Array2, ny: usize, nx: usize) -> Result<(), GridError> {
    if a.ny() == ny && a.nx() == nx {
        Ok(())
    } else {
        Err(GridError::Shape {
            name: name.to_string(),
            expected: vec![ny, nx],
            found: vec![a.ny(), a.nx()],
        })
    }
}

/// Open the single archive matching a pattern.
pub(crate) fn open_unique(
    source: &dyn ArchiveSource,
    pattern: &str,
) -> Result<Box<dyn Archive>, GridError> {
    let matches = source.list(pattern)?;
    if matches.len() != 1 {
        return Err(GridError::MeshFile {
            pattern: pattern.to_string(),
            matches: matches.len(),
        });
    }
    Ok(source.open(&matches[0])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{MemoryArchive, MemorySource};

    #[test]
    fn test_leading_dimensions_are_dropped() {
        // (time, y, x) with two records; only the first is read.
        let data: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let archive = MemoryArchive::new("grid.nc").with_variable("h", &[2, 2, 3], data);
        let h = read_array2(&archive, "h").unwrap();
        assert_eq!((h.ny(), h.nx()), (2, 3));
        assert_eq!(h.get(1, 2), 5.0);
    }

    #[test]
    fn test_rank_too_small() {
        let archive = MemoryArchive::new("grid.nc").with_variable("depth", &[4], vec![0.0; 4]);
        assert!(matches!(
            read_array3(&archive, "depth"),
            Err(GridError::Shape { .. })
        ));
        assert_eq!(read_axis(&archive, "depth").unwrap().len(), 4);
    }

    #[test]
    fn test_open_unique_rejects_ambiguous_pattern() {
        let source = MemorySource::new()
            .with_archive(MemoryArchive::new("mesh_a.nc"))
            .with_archive(MemoryArchive::new("mesh_b.nc"));
        assert!(matches!(
            open_unique(&source, "mesh_*.nc"),
            Err(GridError::MeshFile { matches: 2, .. })
        ));
        assert!(open_unique(&source, "mesh_a.nc").is_ok());
    }
}
