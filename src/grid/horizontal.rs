//! Horizontal grid: node positions, periodicity and geographic mapping.
//!
//! Node longitudes and latitudes are kept as 2-D arrays for every grid
//! type. Rectilinear grids additionally keep their 1-D axes so that point
//! location is a bracket search instead of a polygon bisection.
//!
//! Periodic grids wrap in `i`: index `nx` is index `0` again and the
//! fractional coordinate `x` lives in `[0, nx)`.

use super::array::Array2;
use super::geodesy::find_bracket;
use super::polygon;
use super::GridError;

/// How geographic points are located on the grid.
#[derive(Clone, Debug)]
enum Locator {
    /// Polygon bisection on the 2-D node arrays.
    Curvilinear,
    /// Bracket search on monotonic 1-D axes.
    Rectilinear { lon: Vec<f64>, lat: Vec<f64> },
}

/// Horizontal node layout of a grid.
#[derive(Clone, Debug)]
pub struct HorizontalGrid {
    lon: Array2,
    lat: Array2,
    periodic: bool,
    locator: Locator,
}

impl HorizontalGrid {
    /// Curvilinear grid from 2-D node arrays.
    pub fn curvilinear(lon: Array2, lat: Array2, periodic: bool) -> Result<Self, GridError> {
        if lon.ny() != lat.ny() || lon.nx() != lat.nx() {
            return Err(GridError::Shape {
                name: "latitude".into(),
                expected: vec![lon.ny(), lon.nx()],
                found: vec![lat.ny(), lat.nx()],
            });
        }
        if lon.nx() < 2 || lon.ny() < 2 {
            return Err(GridError::Empty(format!(
                "horizontal grid of {}x{} nodes",
                lon.nx(),
                lon.ny()
            )));
        }
        Ok(Self {
            lon,
            lat,
            periodic,
            locator: Locator::Curvilinear,
        })
    }

    /// Rectilinear grid from 1-D axes.
    pub fn rectilinear(lon: Vec<f64>, lat: Vec<f64>, periodic: bool) -> Result<Self, GridError> {
        if lon.len() < 2 || lat.len() < 2 {
            return Err(GridError::Empty(format!(
                "rectilinear axes of {}x{} nodes",
                lon.len(),
                lat.len()
            )));
        }
        let lon2 = Array2::from_fn(lat.len(), lon.len(), |_, i| lon[i]);
        let lat2 = Array2::from_fn(lat.len(), lon.len(), |j, _| lat[j]);
        Ok(Self {
            lon: lon2,
            lat: lat2,
            periodic,
            locator: Locator::Rectilinear { lon, lat },
        })
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.lon.nx()
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.lon.ny()
    }

    pub fn lon(&self) -> &Array2 {
        &self.lon
    }

    pub fn lat(&self) -> &Array2 {
        &self.lat
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn is_rectilinear(&self) -> bool {
        matches!(self.locator, Locator::Rectilinear { .. })
    }

    /// Wrap an `i` index on periodic grids; identity otherwise.
    #[inline]
    pub fn wrap_i(&self, i: isize) -> isize {
        if self.periodic {
            i.rem_euclid(self.nx() as isize)
        } else {
            i
        }
    }

    /// Wrap a fractional `x` into `[0, nx)` on periodic grids.
    #[inline]
    pub fn wrap_x(&self, x: f64) -> f64 {
        if self.periodic {
            x.rem_euclid(self.nx() as f64)
        } else {
            x
        }
    }

    /// Longitude and latitude of a fractional grid position.
    ///
    /// Bilinear over the four surrounding nodes. Positions beyond the
    /// outermost nodes are clamped, except along `i` on periodic grids.
    pub fn grid_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        let (nx, ny) = (self.nx() as f64, self.ny() as f64);
        let ix = if self.periodic {
            self.wrap_x(x)
        } else {
            x.min(nx - 1.00001).max(0.00001)
        };
        let jy = y.min(ny - 1.00001).max(0.00001);

        let i = ix.floor() as isize;
        let j = jy.floor() as usize;
        let dx = ix - i as f64;
        let dy = jy - j as f64;

        let reference = self.lon.get(j, self.wrap_i(i) as usize);
        let mut lon = 0.0;
        let mut lat = 0.0;
        for ii in 0..2 {
            let ci = self.wrap_i(i + ii) as usize;
            for jj in 0..2 {
                let co = ((1.0 - ii as f64 - dx) * (1.0 - jj as f64 - dy)).abs();
                let mut node_lon = self.lon.get(j + jj as usize, ci);
                // Keep longitudes continuous across the date line.
                if node_lon - reference > 180.0 {
                    node_lon -= 360.0;
                } else if node_lon - reference < -180.0 {
                    node_lon += 360.0;
                }
                lon += co * node_lon;
                lat += co * self.lat.get(j + jj as usize, ci);
            }
        }
        (lon, lat)
    }

    /// Fractional grid position of a geographic point, `None` outside.
    pub fn locate(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        match &self.locator {
            Locator::Curvilinear => polygon::locate(&self.lon, &self.lat, lon, lat),
            Locator::Rectilinear {
                lon: lon_axis,
                lat: lat_axis,
            } => {
                let (j, fy) = find_bracket(lat_axis, lat)?;
                let y = j as f64 + fy;
                let x = if self.periodic {
                    self.locate_periodic_lon(lon_axis, lon)?
                } else {
                    let (i, fx) = find_bracket(lon_axis, lon)?;
                    i as f64 + fx
                };
                Some((x, y))
            }
        }
    }

    /// Longitude lookup on a periodic ascending axis, including the gap
    /// between the last node and the first node shifted by 360 degrees.
    fn locate_periodic_lon(&self, axis: &[f64], lon: f64) -> Option<f64> {
        let first = axis[0];
        let last = axis[axis.len() - 1];
        let lon = first + (lon - first).rem_euclid(360.0);
        if lon <= last {
            let (i, fx) = find_bracket(axis, lon)?;
            return Some(i as f64 + fx);
        }
        let gap = first + 360.0 - last;
        if gap <= 0.0 {
            return None;
        }
        Some((axis.len() - 1) as f64 + (lon - last) / gap)
    }

    /// Sub-grid of rows `j0..j0+ny`, columns `i0..i0+nx`.
    ///
    /// A crop along `i` ends periodicity.
    pub fn crop(&self, j0: usize, i0: usize, ny: usize, nx: usize) -> Self {
        let lon = self.lon.crop(j0, i0, ny, nx);
        let lat = self.lat.crop(j0, i0, ny, nx);
        let periodic = self.periodic && lon.nx() == self.nx();
        let locator = match &self.locator {
            Locator::Curvilinear => Locator::Curvilinear,
            Locator::Rectilinear { lon: lo, lat: la } => Locator::Rectilinear {
                lon: lo[i0..i0 + lon.nx()].to_vec(),
                lat: la[j0..j0 + lon.ny()].to_vec(),
            },
        };
        Self {
            lon,
            lat,
            periodic,
            locator,
        }
    }
}
