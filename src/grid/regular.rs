//! Regular longitude/latitude grids on z-levels.
//!
//! Positions come from 1-D `lon` and `lat` axes, metrics from great-circle
//! distances between nodes. Level depths are read from a 1-D depth axis in
//! either order and sign; faces sit halfway between levels. When the
//! archive has no mask variable, land is wherever a sample field holds
//! fill values.

use log::info;

use super::array::{Array2, Array3};
use super::flux::fixed_level_vertical_velocity;
use super::geometry::GridGeometry;
use super::horizontal::HorizontalGrid;
use super::mask::LandMask;
use super::metrics::HorizontalMetrics;
use super::read::{open_unique, read_array2, read_array3, read_axis};
use super::{GridError, OceanModel};
use crate::io::ArchiveSource;
use crate::vertical::{VerticalGrid, ZLevels};

/// Variable names of a regular grid archive.
#[derive(Clone, Debug, PartialEq)]
pub struct RegularNames {
    pub lon: String,
    pub lat: String,
    pub depth: String,
    pub mask: String,
    /// Field whose fill values mark land when no mask is stored.
    pub mask_sample: String,
}

impl Default for RegularNames {
    fn default() -> Self {
        Self {
            lon: "longitude".into(),
            lat: "latitude".into(),
            depth: "depth".into(),
            mask: "mask".into(),
            mask_sample: "uo".into(),
        }
    }
}

/// Regular lon/lat grid convention.
#[derive(Clone, Debug, Default)]
pub struct RegularModel {
    names: RegularNames,
    grid_file: Option<String>,
    periodic: bool,
}

impl RegularModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(mut self, names: RegularNames) -> Self {
        self.names = names;
        self
    }

    pub fn with_grid_file(mut self, pattern: impl Into<String>) -> Self {
        self.grid_file = Some(pattern.into());
        self
    }

    /// Wrap longitudes (global grids).
    pub fn with_periodic(mut self, periodic: bool) -> Self {
        self.periodic = periodic;
        self
    }

    pub fn names(&self) -> &RegularNames {
        &self.names
    }
}

impl OceanModel for RegularModel {
    fn name(&self) -> &'static str {
        "regular"
    }

    fn load_geometry(
        &self,
        source: &dyn ArchiveSource,
        data_file: &str,
    ) -> Result<GridGeometry, GridError> {
        let n = &self.names;
        let archive = match &self.grid_file {
            Some(pattern) => open_unique(source, pattern)?,
            None => source.open(data_file)?,
        };
        let archive = archive.as_ref();

        let lon = read_axis(archive, &n.lon)?;
        let lat = read_axis(archive, &n.lat)?;
        let (ny, nx) = (lat.len(), lon.len());
        let mut depth: Vec<f64> = read_axis(archive, &n.depth)?.iter().map(|d| d.abs()).collect();
        let nz = depth.len();
        if nz == 0 {
            return Err(GridError::Empty(format!("'{}' has no levels", n.depth)));
        }
        let surface_first = nz > 1 && depth[0] < depth[nz - 1];
        if surface_first {
            depth.reverse();
        }
        let levels = ZLevels::from_centers(depth)?;

        let mask = if archive.has_variable(&n.mask) {
            let shape = archive.variable_shape(&n.mask)?;
            if shape.len() >= 3 && shape[shape.len() - 3] == nz {
                let mut values = read_array3(archive, &n.mask)?;
                if surface_first {
                    values.flip_levels();
                }
                LandMask::from_levels(&values)
            } else {
                LandMask::from_surface(&read_array2(archive, &n.mask)?, nz)
            }
        } else {
            let sample = source.open(data_file)?;
            let mut values = read_array3(sample.as_ref(), &n.mask_sample)?;
            if surface_first {
                values.flip_levels();
            }
            LandMask::from_finite(&values)
        };
        if mask.nz() != nz || mask.ny() != ny || mask.nx() != nx {
            return Err(GridError::Shape {
                name: n.mask.clone(),
                expected: vec![nz, ny, nx],
                found: vec![mask.nz(), mask.ny(), mask.nx()],
            });
        }

        let horizontal = HorizontalGrid::rectilinear(lon, lat, self.periodic)?;
        let metrics = HorizontalMetrics::geodesic(&horizontal);
        info!(
            "regular grid {}x{}x{} from {}, {:.1}% water",
            nx,
            ny,
            nz,
            archive.location(),
            100.0 * mask.wet_fraction()
        );
        Ok(
            GridGeometry::new(horizontal, metrics, VerticalGrid::ZLevels(levels), mask)?
                .with_edge_margin(1.0)
                .with_surface_first(surface_first),
        )
    }

    fn vertical_velocity(
        &self,
        geometry: &GridGeometry,
        u: &Array3,
        v: &Array3,
        _zeta: Option<&Array2>,
    ) -> Array3 {
        fixed_level_vertical_velocity(geometry, u, v)
    }
}
