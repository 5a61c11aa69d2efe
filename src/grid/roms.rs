//! ROMS convention: curvilinear rho grid with terrain-following levels.
//!
//! The static grid comes from the grid file (or the first history file):
//! `lon_rho`, `lat_rho`, `h`, `mask_rho`, `pm`, `pn`. The s-coordinate is
//! rebuilt from `hc`, `Cs_r`, `Cs_w`, found either as global attributes
//! (UCLA files) or as variables (Rutgers files), falling back to the
//! Song-Haidvogel curves when only `theta_s` and `theta_b` are given.
//!
//! U fields have `nx - 1` columns (`xi_u`), v fields `ny - 1` rows
//! (`eta_v`).

use log::info;

use super::array::{Array2, Array3};
use super::flux::{fixed_level_vertical_velocity, integrate_vertical_velocity, FaceFluxes};
use super::geometry::GridGeometry;
use super::horizontal::HorizontalGrid;
use super::mask::LandMask;
use super::metrics::HorizontalMetrics;
use super::read::{expect_shape2, open_unique, read_array2};
use super::{GridError, OceanModel};
use crate::io::{Archive, ArchiveSource};
use crate::vertical::{
    SCoordinate, SCoordinateMode, SongHaidvogelStretching, TerrainLevels, VerticalGrid,
};

/// Variable and dimension names of a ROMS archive.
#[derive(Clone, Debug, PartialEq)]
pub struct RomsNames {
    pub z_dim: String,
    pub lon: String,
    pub lat: String,
    pub bathymetry: String,
    pub mask: String,
    pub pm: String,
    pub pn: String,
    pub hc: String,
    pub cs_r: String,
    pub cs_w: String,
    pub theta_s: String,
    pub theta_b: String,
}

impl Default for RomsNames {
    fn default() -> Self {
        Self {
            z_dim: "s_rho".into(),
            lon: "lon_rho".into(),
            lat: "lat_rho".into(),
            bathymetry: "h".into(),
            mask: "mask_rho".into(),
            pm: "pm".into(),
            pn: "pn".into(),
            hc: "hc".into(),
            cs_r: "Cs_r".into(),
            cs_w: "Cs_w".into(),
            theta_s: "theta_s".into(),
            theta_b: "theta_b".into(),
        }
    }
}

/// ROMS grid convention.
#[derive(Clone, Debug, Default)]
pub struct RomsModel {
    names: RomsNames,
    mode: SCoordinateMode,
    /// Pattern of a separate grid file.
    grid_file: Option<String>,
}

impl RomsModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(mut self, names: RomsNames) -> Self {
        self.names = names;
        self
    }

    /// Select the standard or UCLA vertical transform.
    pub fn with_mode(mut self, mode: SCoordinateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Read the static grid from a separate file matching `pattern`.
    pub fn with_grid_file(mut self, pattern: impl Into<String>) -> Self {
        self.grid_file = Some(pattern.into());
        self
    }

    pub fn names(&self) -> &RomsNames {
        &self.names
    }

    pub fn mode(&self) -> SCoordinateMode {
        self.mode
    }

    /// S-coordinate from tabulated curves or theta parameters.
    fn s_coordinate(&self, archive: &dyn Archive, nz: usize) -> Result<SCoordinate, GridError> {
        let n = &self.names;
        let hc = archive
            .global_or_variable(&n.hc)
            .and_then(|v| v.first().copied())
            .ok_or_else(|| {
                GridError::Vertical(format!(
                    "critical depth '{}' not found in {}",
                    n.hc,
                    archive.location()
                ))
            })?;

        let curves = (
            archive.global_or_variable(&n.cs_r),
            archive.global_or_variable(&n.cs_w),
        );
        if let (Some(cs_r), Some(cs_w)) = curves {
            if cs_r.len() != nz {
                return Err(GridError::Vertical(format!(
                    "'{}' has {} values for {} levels",
                    n.cs_r,
                    cs_r.len(),
                    nz
                )));
            }
            return SCoordinate::new(self.mode, hc, cs_r, cs_w);
        }

        let theta = (
            archive.global_or_variable(&n.theta_s),
            archive.global_or_variable(&n.theta_b),
        );
        match theta {
            (Some(theta_s), Some(theta_b)) if !theta_s.is_empty() && !theta_b.is_empty() => {
                let stretching = SongHaidvogelStretching::new(theta_s[0], theta_b[0]);
                Ok(SCoordinate::from_stretching(self.mode, hc, nz, &stretching))
            }
            _ => Err(GridError::Vertical(format!(
                "no stretching curves ('{}', '{}') nor parameters ('{}', '{}') in {}",
                n.cs_r,
                n.cs_w,
                n.theta_s,
                n.theta_b,
                archive.location()
            ))),
        }
    }
}

impl OceanModel for RomsModel {
    fn name(&self) -> &'static str {
        "roms"
    }

    fn load_geometry(
        &self,
        source: &dyn ArchiveSource,
        data_file: &str,
    ) -> Result<GridGeometry, GridError> {
        let n = &self.names;
        let data = source.open(data_file)?;
        let grid = match &self.grid_file {
            Some(pattern) => open_unique(source, pattern)?,
            None => source.open(data_file)?,
        };

        let lon = read_array2(grid.as_ref(), &n.lon)?;
        let lat = read_array2(grid.as_ref(), &n.lat)?;
        let (ny, nx) = (lon.ny(), lon.nx());
        let h = read_array2(grid.as_ref(), &n.bathymetry)?;
        let mask2 = read_array2(grid.as_ref(), &n.mask)?;
        let pm = read_array2(grid.as_ref(), &n.pm)?;
        let pn = read_array2(grid.as_ref(), &n.pn)?;
        for (name, a) in [
            (&n.lat, &lat),
            (&n.bathymetry, &h),
            (&n.mask, &mask2),
            (&n.pm, &pm),
            (&n.pn, &pn),
        ] {
            expect_shape2(name, a, ny, nx)?;
        }

        let nz = data.dimension_len(&n.z_dim)?;
        if nz == 0 {
            return Err(GridError::Empty(format!("dimension '{}' is empty", n.z_dim)));
        }
        let s = self.s_coordinate(data.as_ref(), nz)?;
        let mask = LandMask::from_surface(&mask2, nz);
        let (z_r, z_w) = s.resting_levels(&h);
        let vertical = VerticalGrid::Terrain(TerrainLevels::new(z_r, z_w, &mask)?);
        let metrics = HorizontalMetrics::from_inverse_spacing(&pm, &pn)?;
        let horizontal = HorizontalGrid::curvilinear(lon, lat, false)?;

        info!(
            "ROMS grid {}x{}x{} from {} ({} s-coordinate, hc={})",
            nx,
            ny,
            nz,
            grid.location(),
            s.mode(),
            s.hc()
        );
        Ok(GridGeometry::new(horizontal, metrics, vertical, mask)?.with_edge_margin(1.0))
    }

    fn vertical_velocity(
        &self,
        geometry: &GridGeometry,
        u: &Array3,
        v: &Array3,
        zeta: Option<&Array2>,
    ) -> Array3 {
        let VerticalGrid::Terrain(levels) = geometry.vertical() else {
            return fixed_level_vertical_velocity(geometry, u, v);
        };
        let z_w = match zeta {
            Some(zeta) => levels.w_levels_with_zeta(zeta),
            None => levels.z_w().clone(),
        };
        let (ny, nx) = (geometry.ny(), geometry.nx());
        let hz = |k: usize, j: usize, i: usize| z_w.get(k + 1, j, i) - z_w.get(k, j, i);
        let fluxes = FaceFluxes::from_velocities(
            geometry,
            u,
            v,
            |k, j, i| 0.5 * (hz(k, j, i) + hz(k, j, (i + 1) % nx)),
            |k, j, i| 0.5 * (hz(k, j, i) + hz(k, (j + 1).min(ny - 1), i)),
        );
        integrate_vertical_velocity(geometry, &fluxes, Some(&z_w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{AttributeValue, MemoryArchive, MemorySource};
    use approx::assert_relative_eq;

    fn grid_archive(name: &str, nz: usize) -> MemoryArchive {
        let (ny, nx) = (4, 5);
        let plane = |f: &dyn Fn(usize, usize) -> f64| -> Vec<f64> {
            (0..ny).flat_map(|j| (0..nx).map(move |i| (j, i))).map(|(j, i)| f(j, i)).collect()
        };
        MemoryArchive::new(name)
            .with_dimension("s_rho", nz)
            .with_variable("lon_rho", &[ny, nx], plane(&|_, i| -5.0 + 0.1 * i as f64))
            .with_variable("lat_rho", &[ny, nx], plane(&|j, _| 45.0 + 0.1 * j as f64))
            .with_variable("h", &[ny, nx], plane(&|_, i| 50.0 + 10.0 * i as f64))
            .with_variable("mask_rho", &[ny, nx], plane(&|j, i| if (j, i) == (0, 0) { 0.0 } else { 1.0 }))
            .with_variable("pm", &[ny, nx], vec![1e-3; ny * nx])
            .with_variable("pn", &[ny, nx], vec![1e-3; ny * nx])
    }

    #[test]
    fn test_load_with_theta_parameters() {
        let archive = grid_archive("roms_his_0001.nc", 6)
            .with_attribute("hc", AttributeValue::Number(10.0))
            .with_attribute("theta_s", AttributeValue::Number(5.0))
            .with_attribute("theta_b", AttributeValue::Number(0.4));
        let source = MemorySource::new().with_archive(archive);
        let g = RomsModel::new().load_geometry(&source, "roms_his_0001.nc").unwrap();

        assert_eq!((g.nx(), g.ny(), g.nz()), (5, 4, 6));
        assert!(!g.is_in_water(3, 0, 0));
        assert!(g.bathymetry(0, 0).is_nan());
        assert_relative_eq!(g.bathymetry(3, 2), 80.0, epsilon = 1e-9);
        assert_relative_eq!(g.metrics().dx_u(1, 1), 1000.0, epsilon = 1e-9);
        assert_eq!(g.edge_margin(), 1.0);
    }

    #[test]
    fn test_tabulated_curves_from_separate_grid_file() {
        let data = MemoryArchive::new("his.nc")
            .with_dimension("s_rho", 2)
            .with_variable("hc", &[], vec![5.0])
            .with_variable("Cs_r", &[2], vec![-0.75, -0.25])
            .with_variable("Cs_w", &[3], vec![-1.0, -0.5, 0.0]);
        let source = MemorySource::new()
            .with_archive(data)
            .with_archive(grid_archive("roms_grd.nc", 2));
        let model = RomsModel::new().with_grid_file("*_grd.nc");
        let g = model.load_geometry(&source, "his.nc").unwrap();
        // Column of 60 m, Cs = s: layer interface halfway down.
        assert_relative_eq!(g.z_to_depth(1.0, 2.0, 0.0), -45.0, epsilon = 1e-9);
        assert_relative_eq!(g.cell_thickness(1, 2, 1), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_stretching_is_an_error() {
        let archive =
            grid_archive("his.nc", 3).with_attribute("hc", AttributeValue::Number(10.0));
        let source = MemorySource::new().with_archive(archive);
        let result = RomsModel::new().load_geometry(&source, "his.nc");
        assert!(matches!(result, Err(GridError::Vertical(_))));
    }

    #[test]
    fn test_flat_free_surface_keeps_rest_velocity() {
        let archive = grid_archive("his.nc", 4)
            .with_attribute("hc", AttributeValue::Number(10.0))
            .with_attribute("theta_s", AttributeValue::Number(5.0))
            .with_attribute("theta_b", AttributeValue::Number(0.4));
        let source = MemorySource::new().with_archive(archive);
        let model = RomsModel::new();
        let g = model.load_geometry(&source, "his.nc").unwrap();
        let u = Array3::zeros(4, 4, 4);
        let v = Array3::zeros(4, 3, 5);
        let w = model.vertical_velocity(&g, &u, &v, Some(&Array2::filled(4, 5, 0.3)));
        assert_eq!((w.nz(), w.ny(), w.nx()), (5, 4, 5));
        assert!(w.as_slice().iter().all(|&x| x == 0.0));
    }
}
