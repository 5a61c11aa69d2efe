//! Horizontal metric scale factors of a staggered grid.
//!
//! Every array is `ny x nx`, indexed like the tracer grid. U-point values
//! at column `i` belong to the face between tracer columns `i` and `i + 1`,
//! v-point values at row `j` to the face between rows `j` and `j + 1`. The
//! last column (row) of u (v) arrays repeats its neighbour.

use super::array::Array2;
use super::geodesy::geodesic_distance;
use super::horizontal::HorizontalGrid;
use super::GridError;

/// Meters per grid unit at tracer, u and v points.
#[derive(Clone, Debug)]
pub struct HorizontalMetrics {
    dx_t: Array2,
    dy_t: Array2,
    dx_u: Array2,
    dy_u: Array2,
    dx_v: Array2,
    dy_v: Array2,
}

impl HorizontalMetrics {
    /// Metrics from explicit scale factors (NEMO `e1*`/`e2*`).
    pub fn from_scale_factors(
        [dx_t, dy_t]: [Array2; 2],
        [dx_u, dy_u]: [Array2; 2],
        [dx_v, dy_v]: [Array2; 2],
    ) -> Result<Self, GridError> {
        let (ny, nx) = (dx_t.ny(), dx_t.nx());
        for (name, a) in [
            ("dy_t", &dy_t),
            ("dx_u", &dx_u),
            ("dy_u", &dy_u),
            ("dx_v", &dx_v),
            ("dy_v", &dy_v),
        ] {
            if a.ny() != ny || a.nx() != nx {
                return Err(GridError::Shape {
                    name: name.into(),
                    expected: vec![ny, nx],
                    found: vec![a.ny(), a.nx()],
                });
            }
        }
        Ok(Self {
            dx_t,
            dy_t,
            dx_u,
            dy_u,
            dx_v,
            dy_v,
        })
    }

    /// Metrics from inverse grid spacings (ROMS `pm`, `pn`).
    ///
    /// Face values are harmonic means of the two neighbouring tracer
    /// points, `2 / (pm[i] + pm[i+1])`.
    pub fn from_inverse_spacing(pm: &Array2, pn: &Array2) -> Result<Self, GridError> {
        let (ny, nx) = (pm.ny(), pm.nx());
        if pn.ny() != ny || pn.nx() != nx {
            return Err(GridError::Shape {
                name: "pn".into(),
                expected: vec![ny, nx],
                found: vec![pn.ny(), pn.nx()],
            });
        }
        let at_u = |p: &Array2| {
            Array2::from_fn(ny, nx, |j, i| {
                let ie = (i + 1).min(nx - 1);
                2.0 / (p.get(j, i) + p.get(j, ie))
            })
        };
        let at_v = |p: &Array2| {
            Array2::from_fn(ny, nx, |j, i| {
                let jn = (j + 1).min(ny - 1);
                2.0 / (p.get(j, i) + p.get(jn, i))
            })
        };
        Ok(Self {
            dx_t: Array2::from_fn(ny, nx, |j, i| 1.0 / pm.get(j, i)),
            dy_t: Array2::from_fn(ny, nx, |j, i| 1.0 / pn.get(j, i)),
            dx_u: at_u(pm),
            dy_u: at_u(pn),
            dx_v: at_v(pm),
            dy_v: at_v(pn),
        })
    }

    /// Metrics from great-circle distances between nodes.
    pub fn geodesic(grid: &HorizontalGrid) -> Self {
        let (ny, nx) = (grid.ny(), grid.nx());
        let (lon, lat) = (grid.lon(), grid.lat());
        let dist = |j0: usize, i0: usize, j1: usize, i1: usize| {
            geodesic_distance(lon.get(j0, i0), lat.get(j0, i0), lon.get(j1, i1), lat.get(j1, i1))
        };
        // Eastern neighbour, wrapped on periodic grids.
        let east = |i: usize| -> Option<usize> {
            if i + 1 < nx {
                Some(i + 1)
            } else if grid.is_periodic() {
                Some(0)
            } else {
                None
            }
        };

        let dx_u = Array2::from_fn(ny, nx, |j, i| match east(i) {
            Some(ie) => dist(j, i, j, ie),
            None => dist(j, i - 1, j, i),
        });
        let dy_v = Array2::from_fn(ny, nx, |j, i| {
            if j + 1 < ny {
                dist(j, i, j + 1, i)
            } else {
                dist(j - 1, i, j, i)
            }
        });
        let dx_t = Array2::from_fn(ny, nx, |j, i| {
            let west = if i > 0 {
                Some(i - 1)
            } else if grid.is_periodic() {
                Some(nx - 1)
            } else {
                None
            };
            match (west, east(i)) {
                (Some(w), Some(_)) => 0.5 * (dx_u.get(j, w) + dx_u.get(j, i)),
                (None, _) => dx_u.get(j, i),
                (Some(w), None) => dx_u.get(j, w),
            }
        });
        let dy_t = Array2::from_fn(ny, nx, |j, i| {
            if j == 0 {
                dy_v.get(0, i)
            } else if j + 1 == ny {
                dy_v.get(j - 1, i)
            } else {
                0.5 * (dy_v.get(j - 1, i) + dy_v.get(j, i))
            }
        });
        let dy_u = Array2::from_fn(ny, nx, |j, i| {
            let ie = east(i).unwrap_or(i);
            0.5 * (dy_t.get(j, i) + dy_t.get(j, ie))
        });
        let dx_v = Array2::from_fn(ny, nx, |j, i| {
            let jn = (j + 1).min(ny - 1);
            0.5 * (dx_t.get(j, i) + dx_t.get(jn, i))
        });
        Self {
            dx_t,
            dy_t,
            dx_u,
            dy_u,
            dx_v,
            dy_v,
        }
    }

    /// Constant spacing everywhere.
    pub fn uniform(ny: usize, nx: usize, dx: f64, dy: f64) -> Self {
        let fill = |v| Array2::filled(ny, nx, v);
        Self {
            dx_t: fill(dx),
            dy_t: fill(dy),
            dx_u: fill(dx),
            dy_u: fill(dy),
            dx_v: fill(dx),
            dy_v: fill(dy),
        }
    }

    #[inline]
    pub fn dx_t(&self, j: usize, i: usize) -> f64 {
        self.dx_t.get(j, i)
    }

    #[inline]
    pub fn dy_t(&self, j: usize, i: usize) -> f64 {
        self.dy_t.get(j, i)
    }

    #[inline]
    pub fn dx_u(&self, j: usize, i: usize) -> f64 {
        self.dx_u.get(j, i)
    }

    #[inline]
    pub fn dy_u(&self, j: usize, i: usize) -> f64 {
        self.dy_u.get(j, i)
    }

    #[inline]
    pub fn dx_v(&self, j: usize, i: usize) -> f64 {
        self.dx_v.get(j, i)
    }

    #[inline]
    pub fn dy_v(&self, j: usize, i: usize) -> f64 {
        self.dy_v.get(j, i)
    }

    /// Horizontal area of tracer cell `(j, i)`.
    #[inline]
    pub fn cell_area(&self, j: usize, i: usize) -> f64 {
        self.dx_t(j, i) * self.dy_t(j, i)
    }

    pub fn crop(&self, j0: usize, i0: usize, ny: usize, nx: usize) -> Self {
        Self {
            dx_t: self.dx_t.crop(j0, i0, ny, nx),
            dy_t: self.dy_t.crop(j0, i0, ny, nx),
            dx_u: self.dx_u.crop(j0, i0, ny, nx),
            dy_u: self.dy_u.crop(j0, i0, ny, nx),
            dx_v: self.dx_v.crop(j0, i0, ny, nx),
            dy_v: self.dy_v.crop(j0, i0, ny, nx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::geodesy::{meters_per_degree, EARTH_RADIUS};
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse_spacing_faces() {
        let pm = Array2::from_fn(2, 3, |_, i| 1.0 / (1000.0 * (i + 1) as f64));
        let pn = Array2::filled(2, 3, 1.0 / 500.0);
        let m = HorizontalMetrics::from_inverse_spacing(&pm, &pn).unwrap();
        assert_relative_eq!(m.dx_t(0, 1), 2000.0, epsilon = 1e-9);
        // Harmonic mean of 1000 m and 2000 m spacings.
        assert_relative_eq!(m.dx_u(0, 0), 2.0 / (1e-3 + 5e-4), epsilon = 1e-9);
        assert_relative_eq!(m.dx_u(0, 2), 3000.0, epsilon = 1e-9);
        assert_relative_eq!(m.dy_v(1, 1), 500.0, epsilon = 1e-9);
        assert_relative_eq!(m.cell_area(0, 0), 500_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_geodesic_metrics_on_regular_grid() {
        let lon: Vec<f64> = (0..5).map(|i| i as f64 * 0.1).collect();
        let lat: Vec<f64> = (0..4).map(|j| 45.0 + j as f64 * 0.1).collect();
        let grid = HorizontalGrid::rectilinear(lon, lat, false).unwrap();
        let m = HorizontalMetrics::geodesic(&grid);

        let dy_expected = EARTH_RADIUS * 0.1_f64.to_radians();
        assert_relative_eq!(m.dy_v(0, 2), dy_expected, max_relative = 1e-9);
        assert_relative_eq!(m.dy_t(1, 1), dy_expected, max_relative = 1e-9);

        let (per_lon, _) = meters_per_degree(45.0);
        assert_relative_eq!(m.dx_u(0, 0), 0.1 * per_lon, max_relative = 1e-4);
        assert!(m.dx_t(3, 2) < m.dx_t(0, 2), "spacing shrinks poleward");
    }

    #[test]
    fn test_rejects_mismatched_shapes() {
        let a = Array2::filled(2, 2, 1.0);
        let b = Array2::filled(2, 3, 1.0);
        let result = HorizontalMetrics::from_scale_factors(
            [a.clone(), a.clone()],
            [a.clone(), b],
            [a.clone(), a],
        );
        assert!(matches!(result, Err(GridError::Shape { .. })));
    }
}
