//! Static grid description shared by every ocean model.
//!
//! This module holds the time-invariant side of a dataset:
//!
//! - [`Array2`] / [`Array3`]: flat row-major storage
//! - [`LandMask`]: water/land per tracer cell and level
//! - [`HorizontalGrid`]: node positions, periodicity, grid <-> geographic
//! - [`HorizontalMetrics`]: meters per grid unit at tracer, u and v points
//! - [`GridGeometry`]: everything above plus the vertical grid, with the
//!   location, water and edge queries used by the transport code
//! - [`OceanModel`]: per-convention loading (ROMS, NEMO, regular) and the
//!   diagnostic vertical velocity
//!
//! # Staggering
//!
//! Fields live on an Arakawa-C grid. Tracers sit on integer coordinates,
//! u on `x = i + 0.5`, v on `y = j + 0.5` and w on `z = k - 0.5` (the lower
//! face of cell `k`).
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::grid::{GridGeometry, HorizontalGrid, HorizontalMetrics, LandMask};
//! use ichthyop_rs::types::GridPoint;
//! use ichthyop_rs::vertical::{VerticalGrid, ZLevels};
//!
//! let lon = (0..10).map(|i| 5.0 + 0.1 * i as f64).collect();
//! let lat = (0..8).map(|j| 43.0 + 0.1 * j as f64).collect();
//! let horizontal = HorizontalGrid::rectilinear(lon, lat, false).unwrap();
//! let metrics = HorizontalMetrics::geodesic(&horizontal);
//! let vertical = VerticalGrid::ZLevels(ZLevels::uniform(5, 50.0).unwrap());
//! let geometry =
//!     GridGeometry::new(horizontal, metrics, vertical, LandMask::all_wet(5, 8, 10)).unwrap();
//!
//! let (x, y) = geometry.geo_to_grid(5.45, 43.32).unwrap();
//! assert!((x - 4.5).abs() < 1e-9 && (y - 3.2).abs() < 1e-9);
//! assert!(geometry.is_in_water_at(GridPoint::new(x, y, 2.0)));
//! ```

mod array;
mod crop;
mod flux;
mod geodesy;
mod geometry;
mod horizontal;
mod mask;
mod metrics;
mod nemo;
mod polygon;
mod read;
mod regular;
mod roms;

pub use array::{Array2, Array3};
pub use crop::DomainCrop;
pub use flux::{fixed_level_vertical_velocity, integrate_vertical_velocity, FaceFluxes};
pub use geodesy::{find_bracket, geodesic_distance, meters_per_degree, EARTH_RADIUS};
pub use geometry::GridGeometry;
pub use horizontal::HorizontalGrid;
pub use mask::LandMask;
pub use metrics::HorizontalMetrics;
pub use nemo::{NemoModel, NemoNames};
pub use polygon::point_in_polygon;
pub use regular::{RegularModel, RegularNames};
pub use roms::{RomsModel, RomsNames};

use std::fmt;

use thiserror::Error;

use crate::io::{ArchiveError, ArchiveSource};

/// Error type for grid construction.
///
/// Every variant is a setup failure: a grid that cannot be built stops the
/// run before any particle moves.
#[derive(Debug, Error)]
pub enum GridError {
    /// Archive access failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Array has an unexpected shape
    #[error("'{name}' has shape {found:?}, expected {expected:?}")]
    Shape {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Invalid vertical coordinate
    #[error("invalid vertical coordinate: {0}")]
    Vertical(String),

    /// Shrink corner lies outside the grid
    #[error("corner ({lon}, {lat}) lies outside the grid")]
    CornerOutsideDomain { lon: f64, lat: f64 },

    /// Static mesh file pattern does not match exactly one archive
    #[error("pattern '{pattern}' matches {matches} files, expected exactly one")]
    MeshFile { pattern: String, matches: usize },

    /// Grid without cells
    #[error("empty grid: {0}")]
    Empty(String),
}

/// Grid convention of an ocean model.
///
/// A model knows where its static grid lives in the archives and how the
/// vertical velocity is rebuilt from the horizontal one. Everything else
/// (location, interpolation, transport) runs on the [`GridGeometry`] it
/// produces.
pub trait OceanModel: Send + Sync + fmt::Debug {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Build the static grid.
    ///
    /// `data_file` is the first archive of the field series; models that
    /// keep their grid in separate mesh files look those up in `source`.
    fn load_geometry(
        &self,
        source: &dyn ArchiveSource,
        data_file: &str,
    ) -> Result<GridGeometry, GridError>;

    /// Diagnostic vertical velocity (m/s, positive up) on the `nz + 1` w
    /// levels, from the horizontal velocities of one time record.
    fn vertical_velocity(
        &self,
        geometry: &GridGeometry,
        u: &Array3,
        v: &Array3,
        zeta: Option<&Array2>,
    ) -> Array3;
}
