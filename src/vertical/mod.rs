//! Vertical coordinate systems of the supported ocean models.
//!
//! Two families are supported:
//!
//! - [`ZLevels`]: geopotential levels whose depth only depends on `k`
//!   (NEMO, regular grids), optionally with partial bottom cells.
//! - [`TerrainLevels`]: terrain-following levels resolved per column,
//!   built from an [`SCoordinate`] and the bathymetry (ROMS).
//!
//! Both share the fractional level convention: `k = 0` is the bottom cell,
//! `k = nz - 1` the surface cell, and whole values of `z` sit on tracer
//! points. Depths are negative downward.
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::vertical::{VerticalGrid, ZLevels};
//!
//! let grid = VerticalGrid::ZLevels(ZLevels::uniform(10, 100.0).unwrap());
//! let z = grid.depth_to_z(3.0, 4.0, -42.0);
//! assert!((grid.z_to_depth(3.0, 4.0, z) + 42.0).abs() < 1e-9);
//! ```

mod s_coordinate;
mod stretching;
mod terrain;
mod z_level;

pub use s_coordinate::{SCoordinate, SCoordinateMode};
pub use stretching::{sc_r, sc_w, SongHaidvogelStretching, Stretching, UniformStretching};
pub use terrain::TerrainLevels;
pub use z_level::ZLevels;

/// Vertical grid of a model.
#[derive(Clone, Debug)]
pub enum VerticalGrid {
    ZLevels(ZLevels),
    Terrain(TerrainLevels),
}

impl VerticalGrid {
    #[inline]
    pub fn nz(&self) -> usize {
        match self {
            Self::ZLevels(z) => z.nz(),
            Self::Terrain(t) => t.nz(),
        }
    }

    /// Depth (negative down) at a fractional grid position.
    pub fn z_to_depth(&self, x: f64, y: f64, z: f64) -> f64 {
        match self {
            Self::ZLevels(levels) => levels.z_to_depth(z),
            Self::Terrain(levels) => levels.z_to_depth(x, y, z),
        }
    }

    /// Fractional level of a depth (negative down) at a horizontal position.
    pub fn depth_to_z(&self, x: f64, y: f64, depth: f64) -> f64 {
        match self {
            Self::ZLevels(levels) => levels.depth_to_z(depth),
            Self::Terrain(levels) => levels.depth_to_z(x, y, depth),
        }
    }

    /// Highest fractional level a particle can occupy.
    ///
    /// Z-levels extend half a cell above the top tracer point up to the
    /// surface; terrain-following levels stop at the top rho level.
    pub fn surface_z(&self) -> f64 {
        match self {
            Self::ZLevels(levels) => levels.surface_z(),
            Self::Terrain(levels) => (levels.nz() - 1) as f64,
        }
    }

    /// Depth (negative down) of w level `kw`, the lower face of cell `kw`.
    pub fn face_depth(&self, kw: usize, j: usize, i: usize) -> f64 {
        match self {
            Self::ZLevels(levels) => -levels.depth_w()[kw.min(levels.nz())],
            Self::Terrain(levels) => levels.z_w().get(kw.min(levels.nz()), j, i),
        }
    }

    /// Thickness in meters of cell `(k, j, i)`.
    #[inline]
    pub fn cell_thickness(&self, k: usize, j: usize, i: usize) -> f64 {
        match self {
            Self::ZLevels(levels) => levels.cell_thickness(k, j, i),
            Self::Terrain(levels) => levels.cell_thickness(k, j, i),
        }
    }

    /// Distance in meters between the two faces around w level `kw`.
    #[inline]
    pub fn w_level_span(&self, kw: usize, j: usize, i: usize) -> f64 {
        match self {
            Self::ZLevels(levels) => levels.w_level_span(kw),
            Self::Terrain(levels) => levels.w_level_span(kw, j, i),
        }
    }

    pub fn crop(&self, j0: usize, i0: usize, ny: usize, nx: usize) -> Self {
        match self {
            Self::ZLevels(levels) => Self::ZLevels(levels.crop(j0, i0, ny, nx)),
            Self::Terrain(levels) => Self::Terrain(levels.crop(j0, i0, ny, nx)),
        }
    }
}
