//! NEMO convention: curvilinear T grid on z-levels with partial steps.
//!
//! The static grid is split over up to three mesh files (mask, horizontal
//! and vertical mesh), each found by a filename pattern that must match
//! exactly one archive. Levels are stored surface first in NEMO files and
//! flipped here so that `k = 0` is the bottom.
//!
//! Missing u/v scale factors fall back to the T-point ones, missing face
//! thicknesses to the thinner of the two neighbouring cells.

use log::{debug, info};

use super::array::{Array2, Array3};
use super::flux::fixed_level_vertical_velocity;
use super::geometry::GridGeometry;
use super::horizontal::HorizontalGrid;
use super::mask::LandMask;
use super::metrics::HorizontalMetrics;
use super::read::{expect_shape2, open_unique, read_array2, read_array3, read_axis};
use super::{GridError, OceanModel};
use crate::io::{Archive, ArchiveSource};
use crate::vertical::{VerticalGrid, ZLevels};

/// Variable names of the NEMO mesh files.
#[derive(Clone, Debug, PartialEq)]
pub struct NemoNames {
    pub lon: String,
    pub lat: String,
    pub mask: String,
    pub e1t: String,
    pub e2t: String,
    pub e1u: String,
    pub e2u: String,
    pub e1v: String,
    pub e2v: String,
    pub e3t: String,
    pub e3u: String,
    pub e3v: String,
    pub gdept: String,
    pub gdepw: String,
}

impl Default for NemoNames {
    fn default() -> Self {
        Self {
            lon: "glamt".into(),
            lat: "gphit".into(),
            mask: "tmask".into(),
            e1t: "e1t".into(),
            e2t: "e2t".into(),
            e1u: "e1u".into(),
            e2u: "e2u".into(),
            e1v: "e1v".into(),
            e2v: "e2v".into(),
            e3t: "e3t_0".into(),
            e3u: "e3u_0".into(),
            e3v: "e3v_0".into(),
            gdept: "gdept_1d".into(),
            gdepw: "gdepw_1d".into(),
        }
    }
}

/// NEMO grid convention.
#[derive(Clone, Debug, Default)]
pub struct NemoModel {
    names: NemoNames,
    mask_file: Option<String>,
    horizontal_file: Option<String>,
    vertical_file: Option<String>,
    periodic: bool,
}

impl NemoModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(mut self, names: NemoNames) -> Self {
        self.names = names;
        self
    }

    /// Patterns of the mask, horizontal mesh and vertical mesh files.
    ///
    /// Without patterns every mesh variable is read from the first data
    /// archive.
    pub fn with_mesh_files(
        mut self,
        mask: impl Into<String>,
        horizontal: impl Into<String>,
        vertical: impl Into<String>,
    ) -> Self {
        self.mask_file = Some(mask.into());
        self.horizontal_file = Some(horizontal.into());
        self.vertical_file = Some(vertical.into());
        self
    }

    /// Wrap the grid in `i` (global ORCA configurations).
    pub fn with_periodic(mut self, periodic: bool) -> Self {
        self.periodic = periodic;
        self
    }

    pub fn names(&self) -> &NemoNames {
        &self.names
    }

    fn open(
        source: &dyn ArchiveSource,
        pattern: &Option<String>,
        data_file: &str,
    ) -> Result<Box<dyn Archive>, GridError> {
        match pattern {
            Some(pattern) => open_unique(source, pattern),
            None => Ok(source.open(data_file)?),
        }
    }

    /// Optional 2-D variable, `fallback` when absent.
    fn read_or(archive: &dyn Archive, name: &str, fallback: &Array2) -> Result<Array2, GridError> {
        if archive.has_variable(name) {
            let a = read_array2(archive, name)?;
            expect_shape2(name, &a, fallback.ny(), fallback.nx())?;
            Ok(a)
        } else {
            debug!("{} not found in {}, using T-point values", name, archive.location());
            Ok(fallback.clone())
        }
    }

    /// 3-D variable flipped to bottom-first.
    fn read_levels(archive: &dyn Archive, name: &str) -> Result<Array3, GridError> {
        let mut a = read_array3(archive, name)?;
        a.flip_levels();
        Ok(a)
    }

    fn metrics(&self, hgr: &dyn Archive, ny: usize, nx: usize) -> Result<HorizontalMetrics, GridError> {
        let n = &self.names;
        let e1t = read_array2(hgr, &n.e1t)?;
        let e2t = read_array2(hgr, &n.e2t)?;
        expect_shape2(&n.e1t, &e1t, ny, nx)?;
        expect_shape2(&n.e2t, &e2t, ny, nx)?;
        let e1u = Self::read_or(hgr, &n.e1u, &e1t)?;
        let e2u = Self::read_or(hgr, &n.e2u, &e2t)?;
        let e1v = Self::read_or(hgr, &n.e1v, &e1t)?;
        let e2v = Self::read_or(hgr, &n.e2v, &e2t)?;
        HorizontalMetrics::from_scale_factors([e1t, e2t], [e1u, e2u], [e1v, e2v])
    }

    fn levels(&self, zgr: &dyn Archive, nz: usize) -> Result<ZLevels, GridError> {
        let n = &self.names;
        let mut depth_t = read_axis(zgr, &n.gdept)?;
        let mut depth_w = read_axis(zgr, &n.gdepw)?;
        if depth_t.len() != nz {
            return Err(GridError::Vertical(format!(
                "'{}' has {} levels, mask has {}",
                n.gdept,
                depth_t.len(),
                nz
            )));
        }
        depth_t.reverse();
        depth_w.reverse();
        let mut levels = ZLevels::new(depth_t, depth_w)?;

        if zgr.has_variable(&n.e3t) {
            levels = levels.with_cell_thickness(Self::read_levels(zgr, &n.e3t)?);
        }
        if zgr.has_variable(&n.e3u) && zgr.has_variable(&n.e3v) {
            let e3u = Self::read_levels(zgr, &n.e3u)?;
            let e3v = Self::read_levels(zgr, &n.e3v)?;
            levels = levels.with_face_thickness(e3u, e3v);
        }
        Ok(levels)
    }
}

impl OceanModel for NemoModel {
    fn name(&self) -> &'static str {
        "nemo"
    }

    fn load_geometry(
        &self,
        source: &dyn ArchiveSource,
        data_file: &str,
    ) -> Result<GridGeometry, GridError> {
        let n = &self.names;
        let mask_archive = Self::open(source, &self.mask_file, data_file)?;
        let hgr = Self::open(source, &self.horizontal_file, data_file)?;
        let zgr = Self::open(source, &self.vertical_file, data_file)?;

        let mask_values = Self::read_levels(mask_archive.as_ref(), &n.mask)?;
        let (nz, ny, nx) = (mask_values.nz(), mask_values.ny(), mask_values.nx());
        if nz == 0 || ny < 2 || nx < 2 {
            return Err(GridError::Empty(format!(
                "'{}' has shape {:?}",
                n.mask,
                [nz, ny, nx]
            )));
        }
        let mask = LandMask::from_levels(&mask_values);

        let lon = read_array2(hgr.as_ref(), &n.lon)?;
        let lat = read_array2(hgr.as_ref(), &n.lat)?;
        expect_shape2(&n.lon, &lon, ny, nx)?;
        expect_shape2(&n.lat, &lat, ny, nx)?;
        let metrics = self.metrics(hgr.as_ref(), ny, nx)?;
        let levels = self.levels(zgr.as_ref(), nz)?;
        let horizontal = HorizontalGrid::curvilinear(lon, lat, self.periodic)?;

        info!(
            "NEMO grid {}x{}x{} (mask {}, mesh {}, levels {}){}",
            nx,
            ny,
            nz,
            mask_archive.location(),
            hgr.location(),
            zgr.location(),
            if self.periodic { ", periodic" } else { "" }
        );
        Ok(
            GridGeometry::new(horizontal, metrics, VerticalGrid::ZLevels(levels), mask)?
                .with_edge_margin(2.0)
                .with_surface_first(true),
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
