//! Geographic extent of a grid.

use std::fmt;

/// Geographic bounding box plus the deepest bathymetry of a domain.
///
/// # Example
///
/// ```
/// use ichthyop_rs::types::GeoExtent;
///
/// let mut extent = GeoExtent::empty();
/// extent.include(-5.0, 43.0);
/// extent.include(-1.5, 46.0);
/// extent.include_depth(4200.0);
/// assert_eq!(extent.lon_min, -5.0);
/// assert_eq!(extent.lat_max, 46.0);
/// assert!(extent.contains(-3.0, 44.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoExtent {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
    /// Deepest bathymetry in meters (positive).
    pub depth_max: f64,
}

impl GeoExtent {
    /// Extent containing nothing; grows through [`include`](Self::include).
    pub fn empty() -> Self {
        Self {
            lon_min: f64::INFINITY,
            lon_max: f64::NEG_INFINITY,
            lat_min: f64::INFINITY,
            lat_max: f64::NEG_INFINITY,
            depth_max: 0.0,
        }
    }

    /// Grow the box to include a node. Non-finite coordinates are ignored.
    pub fn include(&mut self, lon: f64, lat: f64) {
        if !lon.is_finite() || !lat.is_finite() {
            return;
        }
        self.lon_min = self.lon_min.min(lon);
        self.lon_max = self.lon_max.max(lon);
        self.lat_min = self.lat_min.min(lat);
        self.lat_max = self.lat_max.max(lat);
    }

    /// Track the deepest water column.
    pub fn include_depth(&mut self, depth: f64) {
        if depth.is_finite() {
            self.depth_max = self.depth_max.max(depth);
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max && lat >= self.lat_min && lat <= self.lat_max
    }

    pub fn is_empty(&self) -> bool {
        self.lon_min > self.lon_max || self.lat_min > self.lat_max
    }
}

impl Default for GeoExtent {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for GeoExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lon [{:.3}, {:.3}], lat [{:.3}, {:.3}], depth max {:.1}m",
            self.lon_min, self.lon_max, self.lat_min, self.lat_max, self.depth_max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_extent() {
        let extent = GeoExtent::empty();
        assert!(extent.is_empty());
        assert!(!extent.contains(0.0, 0.0));
    }

    #[test]
    fn test_nan_nodes_ignored() {
        let mut extent = GeoExtent::empty();
        extent.include(f64::NAN, 10.0);
        assert!(extent.is_empty());
        extent.include(1.0, 2.0);
        assert!(!extent.is_empty());
        assert_eq!(extent.lon_min, extent.lon_max);
    }
}
