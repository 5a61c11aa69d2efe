//! Geodesic helpers for geographic grids.
//!
//! Great-circle distances locate points on rectilinear grids and give the
//! metric scale factors (meters per grid unit) of regular lon/lat grids.

use std::f64::consts::PI;

/// Earth radius used for grid metrics, in meters.
pub const EARTH_RADIUS: f64 = 6_367_000.0;

const DEG2RAD: f64 = PI / 180.0;

/// Great-circle distance in meters between two (lon, lat) positions.
///
/// # Example
///
/// ```
/// use ichthyop_rs::grid::geodesic_distance;
///
/// // One degree of latitude is about 111 km.
/// let d = geodesic_distance(0.0, 45.0, 0.0, 46.0);
/// assert!((d - 111_125.0).abs() < 100.0);
/// ```
pub fn geodesic_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1 * DEG2RAD;
    let phi2 = lat2 * DEG2RAD;
    let dphi = phi2 - phi1;
    let dlambda = wrap_longitude_delta(lon2 - lon1) * DEG2RAD;

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Longitude difference folded into (-180, 180].
#[inline]
pub fn wrap_longitude_delta(mut dlon: f64) -> f64 {
    while dlon > 180.0 {
        dlon -= 360.0;
    }
    while dlon <= -180.0 {
        dlon += 360.0;
    }
    dlon
}

/// Meters per degree of (longitude, latitude) at a given latitude.
pub fn meters_per_degree(lat: f64) -> (f64, f64) {
    let per_deg_lat = EARTH_RADIUS * DEG2RAD;
    (per_deg_lat * (lat * DEG2RAD).cos(), per_deg_lat)
}

/// Bracket `value` in a monotonic axis.
///
/// Returns `(lower, fraction)` with `axis[lower] <= value <= axis[lower + 1]`
/// for ascending axes (mirrored for descending ones) and the fractional
/// position between the two nodes measured in index direction. `None` if the
/// value lies outside the axis.
pub fn find_bracket(axis: &[f64], value: f64) -> Option<(usize, f64)> {
    if axis.len() < 2 || !value.is_finite() {
        return None;
    }
    let ascending = axis[1] > axis[0];

    // Binary search on the monotonic axis.
    let (mut lo, mut hi) = (0usize, axis.len() - 1);
    let inside = if ascending {
        axis[lo] <= value && value <= axis[hi]
    } else {
        axis[hi] <= value && value <= axis[lo]
    };
    if !inside {
        return None;
    }
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        let go_right = if ascending {
            axis[mid] <= value
        } else {
            axis[mid] >= value
        };
        if go_right {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let span = axis[hi] - axis[lo];
    let f = if span.abs() < 1e-12 {
        0.0
    } else {
        (value - axis[lo]) / span
    };
    Some((lo, f.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_symmetric_and_zero() {
        let d1 = geodesic_distance(-4.0, 47.0, -3.0, 47.5);
        let d2 = geodesic_distance(-3.0, 47.5, -4.0, 47.0);
        assert_relative_eq!(d1, d2, epsilon = 1e-6);
        assert_eq!(geodesic_distance(10.0, 10.0, 10.0, 10.0), 0.0);
    }

    #[test]
    fn test_distance_across_dateline() {
        let d = geodesic_distance(179.5, 0.0, -179.5, 0.0);
        assert_relative_eq!(d, EARTH_RADIUS * DEG2RAD, max_relative = 1e-9);
    }

    #[test]
    fn test_meters_per_degree_shrinks_poleward() {
        let (dx_eq, dy_eq) = meters_per_degree(0.0);
        let (dx_60, dy_60) = meters_per_degree(60.0);
        assert_relative_eq!(dx_eq, dy_eq, epsilon = 1e-9);
        assert_relative_eq!(dx_60, 0.5 * dx_eq, max_relative = 1e-9);
        assert_eq!(dy_60, dy_eq);
    }

    #[test]
    fn test_find_bracket_ascending_and_descending() {
        let up = [0.0, 1.0, 2.0, 4.0];
        assert_eq!(find_bracket(&up, 3.0), Some((2, 0.5)));
        assert_eq!(find_bracket(&up, 0.0), Some((0, 0.0)));
        assert_eq!(find_bracket(&up, 4.5), None);

        let down = [4.0, 2.0, 1.0, 0.0];
        let (lo, f) = find_bracket(&down, 3.0).unwrap();
        assert_eq!(lo, 0);
        assert_relative_eq!(f, 0.5);
    }
}
