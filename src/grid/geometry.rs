//! Static geometry of a model grid.
//!
//! [`GridGeometry`] bundles everything that does not change during a run:
//! node positions, metrics, vertical levels, the land mask and the
//! bathymetry. It answers "where is this point", "is it in water" and
//! "what are the local metrics" for the interpolation and transport code,
//! and is shared read-only between particle workers.
//!
//! Lookups outside the grid never panic: water tests return `false`,
//! bathymetry returns NaN and location returns `None`.

use log::info;

use super::array::Array2;
use super::crop::DomainCrop;
use super::horizontal::HorizontalGrid;
use super::mask::LandMask;
use super::metrics::HorizontalMetrics;
use super::GridError;
use crate::types::{GeoExtent, GeoPoint, GridPoint};
use crate::vertical::VerticalGrid;

/// Static geometry of a model grid.
#[derive(Clone, Debug)]
pub struct GridGeometry {
    horizontal: HorizontalGrid,
    metrics: HorizontalMetrics,
    vertical: VerticalGrid,
    mask: LandMask,
    /// Water depth in meters, NaN on land.
    bathymetry: Array2,
    /// Offset of this grid in the archive grid, `(i0, j0)`.
    origin: (usize, usize),
    /// Distance in cells from a closed boundary where advection stops.
    edge_margin: f64,
    /// Archive fields are stored surface level first.
    surface_first: bool,
}

impl GridGeometry {
    /// Assemble a geometry and derive its bathymetry.
    pub fn new(
        horizontal: HorizontalGrid,
        metrics: HorizontalMetrics,
        vertical: VerticalGrid,
        mask: LandMask,
    ) -> Result<Self, GridError> {
        let (ny, nx, nz) = (horizontal.ny(), horizontal.nx(), vertical.nz());
        if mask.nz() != nz || mask.ny() != ny || mask.nx() != nx {
            return Err(GridError::Shape {
                name: "mask".into(),
                expected: vec![nz, ny, nx],
                found: vec![mask.nz(), mask.ny(), mask.nx()],
            });
        }
        let bathymetry = column_depths(&vertical, &mask);
        Ok(Self {
            horizontal,
            metrics,
            vertical,
            mask,
            bathymetry,
            origin: (0, 0),
            edge_margin: 1.0,
            surface_first: false,
        })
    }

    /// Set the closed-boundary margin (in cells) used by [`is_on_edge`](Self::is_on_edge).
    pub fn with_edge_margin(mut self, margin: f64) -> Self {
        self.edge_margin = margin;
        self
    }

    /// Declare that archive fields store the surface level first.
    pub fn with_surface_first(mut self, surface_first: bool) -> Self {
        self.surface_first = surface_first;
        self
    }

    // =========================================================================
    // Dimensions and components
    // =========================================================================

    #[inline]
    pub fn nx(&self) -> usize {
        self.horizontal.nx()
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.horizontal.ny()
    }

    #[inline]
    pub fn nz(&self) -> usize {
        self.vertical.nz()
    }

    /// Offset `(i0, j0)` of this grid within the archive grid.
    pub fn origin(&self) -> (usize, usize) {
        self.origin
    }

    pub fn horizontal(&self) -> &HorizontalGrid {
        &self.horizontal
    }

    pub fn metrics(&self) -> &HorizontalMetrics {
        &self.metrics
    }

    pub fn vertical(&self) -> &VerticalGrid {
        &self.vertical
    }

    pub fn mask(&self) -> &LandMask {
        &self.mask
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.horizontal.is_periodic()
    }

    pub fn edge_margin(&self) -> f64 {
        self.edge_margin
    }

    pub fn surface_first(&self) -> bool {
        self.surface_first
    }

    // =========================================================================
    // Water and boundary tests
    // =========================================================================

    /// Mask lookup; indices outside the grid are not in water.
    #[inline]
    pub fn is_in_water(&self, k: isize, j: isize, i: isize) -> bool {
        self.mask.is_wet(k, j, self.horizontal.wrap_i(i))
    }

    /// Water test at the tracer node nearest to a position.
    pub fn is_in_water_at(&self, p: GridPoint) -> bool {
        if !p.is_finite() {
            return false;
        }
        let k = p.z.max(0.0).min((self.nz() - 1) as f64).round() as isize;
        self.is_in_water(k, p.y.round() as isize, p.x.round() as isize)
    }

    /// True if one of the other three nodes of the cell around a position,
    /// seen from its nearest node, is land.
    pub fn is_close_to_coast(&self, p: GridPoint) -> bool {
        let i = p.x.round() as isize;
        let j = p.y.round() as isize;
        let k = p.z.max(0.0).min((self.nz() - 1) as f64).round() as isize;
        let ii = if i == p.x.floor() as isize { 1 } else { -1 };
        let jj = if j == p.y.floor() as isize { 1 } else { -1 };
        !(self.is_in_water(k, j, i + ii)
            && self.is_in_water(k, j + jj, i + ii)
            && self.is_in_water(k, j + jj, i))
    }

    /// True within the edge margin of a closed boundary.
    ///
    /// Periodic grids have no `i` boundary.
    pub fn is_on_edge(&self, p: GridPoint) -> bool {
        let m = self.edge_margin;
        let (nx, ny) = (self.nx() as f64, self.ny() as f64);
        let x_edge = !self.is_periodic() && (p.x < m || p.x > nx - 1.0 - m);
        x_edge || p.y < m || p.y > ny - 1.0 - m
    }

    // =========================================================================
    // Coordinate transforms
    // =========================================================================

    /// Horizontal grid position of a geographic point, `None` outside the grid.
    pub fn geo_to_grid(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        self.horizontal.locate(lon, lat)
    }

    /// Grid position of a geographic point including its depth.
    pub fn geo_to_grid_point(&self, geo: GeoPoint) -> Option<GridPoint> {
        let (x, y) = self.geo_to_grid(geo.lon, geo.lat)?;
        let z = if self.nz() > 1 {
            self.depth_to_z(x, y, geo.depth)
        } else {
            0.0
        };
        Some(GridPoint::new(x, y, z))
    }

    /// Geographic position of a grid point.
    pub fn grid_to_geo(&self, p: GridPoint) -> GeoPoint {
        let (lon, lat) = self.horizontal.grid_to_geo(p.x, p.y);
        GeoPoint::new(lon, lat, self.z_to_depth(p.x, p.y, p.z))
    }

    /// Depth (negative down) of a fractional level.
    pub fn z_to_depth(&self, x: f64, y: f64, z: f64) -> f64 {
        self.vertical.z_to_depth(self.horizontal.wrap_x(x), y, z)
    }

    /// Fractional level of a depth (negative down).
    pub fn depth_to_z(&self, x: f64, y: f64, depth: f64) -> f64 {
        self.vertical.depth_to_z(self.horizontal.wrap_x(x), y, depth)
    }

    /// Highest fractional level inside the water column.
    pub fn surface_z(&self) -> f64 {
        self.vertical.surface_z()
    }

    // =========================================================================
    // Metrics
    // =========================================================================

    /// Water depth of column `(i, j)` in meters; NaN on land or outside.
    pub fn bathymetry(&self, i: isize, j: isize) -> f64 {
        let i = self.horizontal.wrap_i(i);
        self.bathymetry.checked(j, i).unwrap_or(f64::NAN)
    }

    pub fn bathymetry_field(&self) -> &Array2 {
        &self.bathymetry
    }

    #[inline]
    pub fn cell_thickness(&self, k: usize, j: usize, i: usize) -> f64 {
        self.vertical.cell_thickness(k, j, i)
    }

    /// Depth (negative down) of w level `kw` in column `(j, i)`.
    #[inline]
    pub fn face_depth(&self, kw: usize, j: usize, i: usize) -> f64 {
        self.vertical.face_depth(kw, j, i)
    }

    #[inline]
    pub fn w_level_span(&self, kw: usize, j: usize, i: usize) -> f64 {
        self.vertical.w_level_span(kw, j, i)
    }

    /// Geographic bounding box and deepest water column.
    pub fn extent(&self) -> GeoExtent {
        let mut extent = GeoExtent::empty();
        for j in 0..self.ny() {
            for i in 0..self.nx() {
                extent.include(
                    self.horizontal.lon().get(j, i),
                    self.horizontal.lat().get(j, i),
                );
                extent.include_depth(self.bathymetry.get(j, i));
            }
        }
        extent
    }

    // =========================================================================
    // Domain reduction
    // =========================================================================

    /// Restrict the geometry to a window of the current grid.
    pub fn crop(&self, window: DomainCrop) -> Self {
        let DomainCrop { i0, j0, nx, ny } = window;
        Self {
            horizontal: self.horizontal.crop(j0, i0, ny, nx),
            metrics: self.metrics.crop(j0, i0, ny, nx),
            vertical: self.vertical.crop(j0, i0, ny, nx),
            mask: self.mask.crop(j0, i0, ny, nx),
            bathymetry: self.bathymetry.crop(j0, i0, ny, nx),
            origin: (self.origin.0 + i0, self.origin.1 + j0),
            edge_margin: self.edge_margin,
            surface_first: self.surface_first,
        }
    }

    /// Shrink the domain to the box spanned by two geographic corners.
    pub fn shrink(
        &self,
        north_west: (f64, f64),
        south_east: (f64, f64),
    ) -> Result<Self, GridError> {
        let window = DomainCrop::from_corners(&self.horizontal, north_west, south_east)?;
        if window.is_full(self.nx(), self.ny()) {
            return Ok(self.clone());
        }
        let shrunk = self.crop(window);
        info!(
            "Domain shrunk to {} ({}x{} cells, origin {:?})",
            window,
            shrunk.nx(),
            shrunk.ny(),
            shrunk.origin
        );
        Ok(shrunk)
    }
}

/// Sum of wet cell thicknesses per column; NaN where the surface is land.
fn column_depths(vertical: &VerticalGrid, mask: &LandMask) -> Array2 {
    let nz = vertical.nz();
    Array2::from_fn(mask.ny(), mask.nx(), |j, i| {
        if !mask.is_wet_surface(j as isize, i as isize) {
            return f64::NAN;
        }
        (0..nz)
            .filter(|&k| mask.is_wet(k as isize, j as isize, i as isize))
            .map(|k| vertical.cell_thickness(k, j, i))
            .sum()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertical::ZLevels;
    use approx::assert_relative_eq;

    /// 8x6 grid, 4 levels of 10 m, land in column i = 0 and one deep cell dry.
    fn geometry() -> GridGeometry {
        let lon = (0..8).map(|i| 5.0 + 0.1 * i as f64).collect();
        let lat = (0..6).map(|j| 43.0 + 0.1 * j as f64).collect();
        let horizontal = HorizontalGrid::rectilinear(lon, lat, false).unwrap();
        let metrics = HorizontalMetrics::uniform(6, 8, 1000.0, 1000.0);
        let vertical = VerticalGrid::ZLevels(ZLevels::uniform(4, 40.0).unwrap());
        let mut mask = LandMask::all_wet(4, 6, 8);
        for j in 0..6 {
            mask.set_column_dry(j, 0);
        }
        mask.set_dry(0, 3, 4);
        GridGeometry::new(horizontal, metrics, vertical, mask).unwrap()
    }

    #[test]
    fn test_mask_consistency() {
        let g = geometry();
        for k in 0..4 {
            for j in 0..6 {
                for i in 0..8 {
                    assert_eq!(
                        g.is_in_water(k, j, i),
                        g.mask().is_wet(k, j, i),
                        "cell ({}, {}, {})",
                        k,
                        j,
                        i
                    );
                }
            }
        }
        assert!(!g.is_in_water(0, 0, -1));
        assert!(!g.is_in_water(4, 0, 2));
    }

    #[test]
    fn test_bathymetry() {
        let g = geometry();
        assert!(g.bathymetry(0, 2).is_nan());
        assert_relative_eq!(g.bathymetry(2, 2), 40.0);
        assert_relative_eq!(g.bathymetry(4, 3), 30.0);
        assert!(g.bathymetry(20, 2).is_nan());
        let extent = g.extent();
        assert_relative_eq!(extent.depth_max, 40.0);
        assert_relative_eq!(extent.lon_max, 5.7, epsilon = 1e-12);
    }

    #[test]
    fn test_close_to_coast() {
        let g = geometry();
        // Interpolation cell reaches into the land column.
        assert!(g.is_close_to_coast(GridPoint::new(0.8, 2.3, 3.0)));
        assert!(!g.is_close_to_coast(GridPoint::new(1.2, 2.3, 3.0)));
        assert!(!g.is_close_to_coast(GridPoint::new(1.7, 2.3, 3.0)));
        // Dry bottom cell at (k=0, j=3, i=4).
        assert!(g.is_close_to_coast(GridPoint::new(3.3, 2.7, 0.0)));
        assert!(!g.is_close_to_coast(GridPoint::new(3.3, 2.7, 2.0)));
    }

    #[test]
    fn test_edges() {
        let g = geometry().with_edge_margin(2.0);
        assert!(g.is_on_edge(GridPoint::new(1.9, 3.0, 0.0)));
        assert!(g.is_on_edge(GridPoint::new(5.1, 3.0, 0.0)));
        assert!(!g.is_on_edge(GridPoint::new(3.0, 2.5, 0.0)));
        assert!(g.is_on_edge(GridPoint::new(3.0, 3.2, 0.0)));
    }

    #[test]
    fn test_geo_round_trip() {
        let g = geometry();
        let p = GridPoint::new(3.3, 2.6, 1.4);
        let geo = g.grid_to_geo(p);
        let q = g.geo_to_grid_point(geo).unwrap();
        assert_relative_eq!(q.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(q.y, p.y, epsilon = 1e-9);
        assert_relative_eq!(q.z, p.z, epsilon = 1e-9);
        assert!(g.geo_to_grid(4.0, 43.2).is_none());
    }

    #[test]
    fn test_shrink_offsets_origin() {
        let g = geometry();
        let shrunk = g.shrink((5.22, 43.38), (5.55, 43.11)).unwrap();
        assert_eq!(shrunk.origin(), (2, 1));
        assert_eq!((shrunk.nx(), shrunk.ny()), (5, 4));
        assert_relative_eq!(shrunk.bathymetry(2, 2), 30.0);
        assert!(g.shrink((1.0, 43.3), (5.5, 43.1)).is_err());
    }
}
