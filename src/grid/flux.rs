//! Diagnostic vertical velocity from horizontal volume fluxes.
//!
//! Continuity integrated upward from the first wet level of each column:
//!
//! ```text
//! W[k+1] = W[k] - (Fu[i] - Fu[i-1] + Fv[j] - Fv[j-1])      (m³/s)
//! w[k]   = W[k] / (dx dy)                                   (m/s)
//! ```
//!
//! where `Fu = u dy_u e3u` and `Fv = v dx_v e3v` are the volume fluxes
//! through the faces of cell `k`. Terrain-following grids additionally
//! remove the linear part of the profile caused by the motion of the
//! s-levels, so that the surface value vanishes.

use super::array::Array3;
use super::geometry::GridGeometry;
use crate::vertical::VerticalGrid;

/// Volume fluxes (m³/s) through the u and v faces, `nz x ny x nx`.
///
/// `u[k][j][i]` is the flux through the face between columns `i` and
/// `i + 1`, `v[k][j][i]` the one between rows `j` and `j + 1`.
#[derive(Clone, Debug)]
pub struct FaceFluxes {
    pub u: Array3,
    pub v: Array3,
}

impl FaceFluxes {
    /// Fluxes from face velocities and face thicknesses.
    ///
    /// Velocity arrays may be narrower than the tracer grid (ROMS stores
    /// `nx - 1` u columns); missing faces and NaN samples carry no flux.
    pub fn from_velocities(
        geometry: &GridGeometry,
        u: &Array3,
        v: &Array3,
        thickness_u: impl Fn(usize, usize, usize) -> f64,
        thickness_v: impl Fn(usize, usize, usize) -> f64,
    ) -> Self {
        let (nz, ny, nx) = (geometry.nz(), geometry.ny(), geometry.nx());
        let metrics = geometry.metrics();
        // The last u face of a closed grid lies outside the domain.
        let nu = if geometry.is_periodic() { nx } else { nx - 1 };

        let flux_u = Array3::from_fn(nz, ny, nx, |k, j, i| {
            if i >= nu || k >= u.nz() || j >= u.ny() || i >= u.nx() {
                return 0.0;
            }
            let f = u.get(k, j, i) * metrics.dy_u(j, i) * thickness_u(k, j, i);
            if f.is_finite() {
                f
            } else {
                0.0
            }
        });
        let flux_v = Array3::from_fn(nz, ny, nx, |k, j, i| {
            if j + 1 >= ny || k >= v.nz() || j >= v.ny() || i >= v.nx() {
                return 0.0;
            }
            let f = v.get(k, j, i) * metrics.dx_v(j, i) * thickness_v(k, j, i);
            if f.is_finite() {
                f
            } else {
                0.0
            }
        });
        Self {
            u: flux_u,
            v: flux_v,
        }
    }
}

/// Integrate continuity into a vertical velocity on `nz + 1` w levels.
///
/// With `moving_levels` (the w depths of a terrain-following grid, same
/// shape as the result) the s-level motion is removed before the surface
/// value is zeroed. Boundary rows and columns copy their inner neighbour,
/// except along the periodic direction.
pub fn integrate_vertical_velocity(
    geometry: &GridGeometry,
    fluxes: &FaceFluxes,
    moving_levels: Option<&Array3>,
) -> Array3 {
    let (nz, ny, nx) = (geometry.nz(), geometry.ny(), geometry.nx());
    let periodic = geometry.is_periodic();
    let mut w = Array3::zeros(nz + 1, ny, nx);
    let (i_start, i_end) = if periodic { (0, nx) } else { (1, nx - 1) };
    let mut column = vec![0.0; nz + 1];

    for j in 1..ny.saturating_sub(1) {
        for i in i_start..i_end {
            let Some(k0) = geometry.mask().first_wet_level(j, i) else {
                continue;
            };
            let iw = if i == 0 { nx - 1 } else { i - 1 };

            column.iter_mut().for_each(|c| *c = 0.0);
            for k in k0..nz {
                let divergence = fluxes.u.get(k, j, i) - fluxes.u.get(k, j, iw)
                    + fluxes.v.get(k, j, i)
                    - fluxes.v.get(k, j - 1, i);
                column[k + 1] = column[k] - divergence;
            }

            if let Some(z_w) = moving_levels {
                let bottom = z_w.get(0, j, i);
                let height = z_w.get(nz, j, i) - bottom;
                if height > 0.0 {
                    let slope = column[nz] / height;
                    for (k, c) in column.iter_mut().enumerate().take(nz).skip(1) {
                        *c -= slope * (z_w.get(k, j, i) - bottom);
                    }
                }
            }
            column[nz] = 0.0;

            let area = geometry.metrics().cell_area(j, i);
            for (k, &c) in column.iter().enumerate() {
                w.set(k, j, i, c / area);
            }
        }
    }

    copy_boundaries(&mut w, periodic);
    w
}

/// Vertical velocity on fixed levels.
///
/// Z-level grids use their face thicknesses (partial steps included);
/// terrain-following levels at rest use the mean of the two neighbouring
/// cells.
pub fn fixed_level_vertical_velocity(geometry: &GridGeometry, u: &Array3, v: &Array3) -> Array3 {
    let fluxes = match geometry.vertical() {
        VerticalGrid::ZLevels(levels) => FaceFluxes::from_velocities(
            geometry,
            u,
            v,
            |k, j, i| levels.face_thickness_u(k, j, i),
            |k, j, i| levels.face_thickness_v(k, j, i),
        ),
        VerticalGrid::Terrain(_) => {
            let (ny, nx) = (geometry.ny(), geometry.nx());
            FaceFluxes::from_velocities(
                geometry,
                u,
                v,
                |k, j, i| {
                    let ie = (i + 1) % nx;
                    0.5 * (geometry.cell_thickness(k, j, i) + geometry.cell_thickness(k, j, ie))
                },
                |k, j, i| {
                    let jn = (j + 1).min(ny - 1);
                    0.5 * (geometry.cell_thickness(k, j, i) + geometry.cell_thickness(k, jn, i))
                },
            )
        }
    };
    integrate_vertical_velocity(geometry, &fluxes, None)
}

fn copy_boundaries(w: &mut Array3, periodic: bool) {
    let (nl, ny, nx) = (w.nz(), w.ny(), w.nx());
    if nx < 2 || ny < 2 {
        return;
    }
    for k in 0..nl {
        if !periodic {
            for j in 0..ny {
                w.set(k, j, 0, w.get(k, j, 1));
                w.set(k, j, nx - 1, w.get(k, j, nx - 2));
            }
        }
        for i in 0..nx {
            w.set(k, 0, i, w.get(k, 1, i));
            w.set(k, ny - 1, i, w.get(k, ny - 2, i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{HorizontalGrid, HorizontalMetrics, LandMask};
    use crate::vertical::{VerticalGrid, ZLevels};
    use approx::assert_relative_eq;

    /// 5x5 grid, two 10 m layers, 1 km spacing.
    fn geometry() -> GridGeometry {
        let lon = (0..5).map(|i| i as f64 * 0.01).collect();
        let lat = (0..5).map(|j| j as f64 * 0.01).collect();
        let horizontal = HorizontalGrid::rectilinear(lon, lat, false).unwrap();
        let metrics = HorizontalMetrics::uniform(5, 5, 1000.0, 1000.0);
        let vertical = VerticalGrid::ZLevels(ZLevels::uniform(2, 20.0).unwrap());
        GridGeometry::new(horizontal, metrics, vertical, LandMask::all_wet(2, 5, 5)).unwrap()
    }

    #[test]
    fn test_convergence_drives_upwelling() {
        let g = geometry();
        // u decreases eastward: -du/dx = 1e-4 1/s.
        let u = Array3::from_fn(2, 5, 4, |_, _, i| 1.0 - 0.1 * i as f64);
        let v = Array3::zeros(2, 4, 5);
        let fluxes = FaceFluxes::from_velocities(&g, &u, &v, |_, _, _| 10.0, |_, _, _| 10.0);
        let w = integrate_vertical_velocity(&g, &fluxes, None);

        assert_eq!(w.get(0, 2, 2), 0.0);
        assert_relative_eq!(w.get(1, 2, 2), 1e-3, epsilon = 1e-12);
        assert_eq!(w.get(2, 2, 2), 0.0);
        // Boundary columns copy their neighbour.
        assert_relative_eq!(w.get(1, 2, 0), w.get(1, 2, 1));
        assert_relative_eq!(w.get(1, 0, 2), w.get(1, 1, 2));
    }

    #[test]
    fn test_moving_levels_remove_surface_residual() {
        let g = geometry();
        // Convergence in the bottom layer only.
        let u = Array3::from_fn(2, 5, 4, |k, _, i| if k == 0 { 1.0 - 0.1 * i as f64 } else { 0.0 });
        let v = Array3::zeros(2, 4, 5);
        let fluxes = FaceFluxes::from_velocities(&g, &u, &v, |_, _, _| 10.0, |_, _, _| 10.0);
        let z_w = Array3::from_fn(3, 5, 5, |k, _, _| -20.0 + 10.0 * k as f64);
        let w = integrate_vertical_velocity(&g, &fluxes, Some(&z_w));

        // 1000 m³/s at the interface, minus half of the surface residual.
        assert_relative_eq!(w.get(1, 2, 2), 5e-4, epsilon = 1e-12);
        assert_eq!(w.get(2, 2, 2), 0.0);
    }

    #[test]
    fn test_fixed_levels_match_explicit_thickness() {
        let g = geometry();
        let u = Array3::from_fn(2, 5, 4, |_, _, i| 1.0 - 0.1 * i as f64);
        let v = Array3::zeros(2, 4, 5);
        let w = fixed_level_vertical_velocity(&g, &u, &v);
        assert_relative_eq!(w.get(1, 3, 2), 1e-3, epsilon = 1e-12);
    }

    #[test]
    fn test_land_columns_stay_at_rest() {
        let lon = (0..5).map(|i| i as f64 * 0.01).collect();
        let lat = (0..5).map(|j| j as f64 * 0.01).collect();
        let horizontal = HorizontalGrid::rectilinear(lon, lat, false).unwrap();
        let mut mask = LandMask::all_wet(2, 5, 5);
        mask.set_column_dry(2, 2);
        let g = GridGeometry::new(
            horizontal,
            HorizontalMetrics::uniform(5, 5, 1000.0, 1000.0),
            VerticalGrid::ZLevels(ZLevels::uniform(2, 20.0).unwrap()),
            mask,
        )
        .unwrap();
        let u = Array3::from_fn(2, 5, 4, |_, _, i| 1.0 - 0.1 * i as f64);
        let v = Array3::zeros(2, 4, 5);
        let fluxes = FaceFluxes::from_velocities(&g, &u, &v, |_, _, _| 10.0, |_, _, _| 10.0);
        let w = integrate_vertical_velocity(&g, &fluxes, None);
        assert_eq!(w.get(1, 2, 2), 0.0);
        assert!(w.get(1, 2, 1) > 0.0);
    }
}
