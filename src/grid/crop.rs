//! Working sub-domain of an archive grid.

use std::fmt;

use super::horizontal::HorizontalGrid;
use super::GridError;

/// Window `[i0, i0 + nx) x [j0, j0 + ny)` of the archive grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DomainCrop {
    pub i0: usize,
    pub j0: usize,
    pub nx: usize,
    pub ny: usize,
}

impl DomainCrop {
    /// The whole grid.
    pub fn full(nx: usize, ny: usize) -> Self {
        Self { i0: 0, j0: 0, nx, ny }
    }

    /// Smallest window holding two geographic corners.
    ///
    /// Fails if either corner lies outside the grid. Periodic grids keep
    /// their full `i` range.
    pub fn from_corners(
        grid: &HorizontalGrid,
        north_west: (f64, f64),
        south_east: (f64, f64),
    ) -> Result<Self, GridError> {
        let locate = |(lon, lat): (f64, f64)| {
            grid.locate(lon, lat)
                .ok_or(GridError::CornerOutsideDomain { lon, lat })
        };
        let (x1, y1) = locate(north_west)?;
        let (x2, y2) = locate(south_east)?;

        let (i0, nx) = if grid.is_periodic() {
            (0, grid.nx())
        } else {
            span(x1, x2, grid.nx())
        };
        let (j0, ny) = span(y1, y2, grid.ny());
        Ok(Self { i0, j0, nx, ny })
    }

    pub fn is_full(&self, nx: usize, ny: usize) -> bool {
        self.i0 == 0 && self.j0 == 0 && self.nx == nx && self.ny == ny
    }
}

/// Index window covering two fractional coordinates, at least two nodes wide.
fn span(a: f64, b: f64, n: usize) -> (usize, usize) {
    let lo = a.min(b).floor().max(0.0) as usize;
    let hi = (a.max(b).ceil() as usize).min(n - 1);
    let lo = lo.min(n.saturating_sub(2));
    let len = (hi.max(lo + 1) - lo + 1).min(n - lo);
    (lo, len)
}

impl fmt::Display for DomainCrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "i=[{}, {}) j=[{}, {})",
            self.i0,
            self.i0 + self.nx,
            self.j0,
            self.j0 + self.ny
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(periodic: bool) -> HorizontalGrid {
        let lon = (0..20).map(|i| i as f64).collect();
        let lat = (0..10).map(|j| 30.0 + j as f64).collect();
        HorizontalGrid::rectilinear(lon, lat, periodic).unwrap()
    }

    #[test]
    fn test_corners_floor_and_ceil() {
        let crop = DomainCrop::from_corners(&grid(false), (3.4, 37.2), (8.6, 32.5)).unwrap();
        assert_eq!(crop, DomainCrop { i0: 3, j0: 2, nx: 7, ny: 7 });
    }

    #[test]
    fn test_corner_outside_domain() {
        let result = DomainCrop::from_corners(&grid(false), (-3.0, 37.0), (8.0, 32.0));
        assert!(matches!(result, Err(GridError::CornerOutsideDomain { .. })));
    }

    #[test]
    fn test_periodic_keeps_longitudes() {
        let crop = DomainCrop::from_corners(&grid(true), (3.4, 37.2), (8.6, 32.5)).unwrap();
        assert_eq!((crop.i0, crop.nx), (0, 20));
        assert_eq!((crop.j0, crop.ny), (2, 7));
    }

    #[test]
    fn test_degenerate_window_is_widened() {
        assert_eq!(span(4.0, 4.0, 10), (4, 2));
        assert_eq!(span(9.0, 9.0, 10), (8, 2));
    }
}
