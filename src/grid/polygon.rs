//! Point location on curvilinear grids.
//!
//! The grid cell containing a geographic point is found by recursive
//! bisection: the outline of a sub-grid is a closed polygon, and a
//! crossing-count test tells which half of the current index window holds
//! the point. Once the window is down to a single cell, the fractional
//! position is refined by inverting the bilinear map of that cell.
//!
//! Points lying exactly on the polygon outline (a grid node included) are
//! inside.

use super::array::Array2;

/// Crossing-count point-in-polygon test (Reid, 1969).
///
/// The polygon is closed implicitly (last vertex connects to the first).
/// Points on the outline are classified as inside.
pub fn point_in_polygon(xb: &[f64], yb: &[f64], x: f64, y: f64) -> bool {
    let nb = xb.len().min(yb.len());
    if nb < 3 {
        return false;
    }
    let mut crossings: i32 = 0;
    for k in 0..nb {
        let next = (k + 1) % nb;
        let (x0, y0, x1, y1) = (xb[k], yb[k], xb[next], yb[next]);
        if x0 == x && y0 == y {
            return true;
        }
        if x0 == x1 {
            if x == x0 && (y - y0) * (y1 - y) >= 0.0 {
                return true;
            }
            continue;
        }
        let dx1 = x - x0;
        let dx2 = x1 - x;
        let dxy = dx2 * (y - y0) - dx1 * (y1 - y);
        if dxy == 0.0 && dx1 * dx2 >= 0.0 {
            return true;
        }
        let inc = if (dx1 == 0.0 && y >= y0) || (dx2 == 0.0 && y >= y1) {
            1
        } else if dx1 * dx2 > 0.0 && (x1 - x0) * dxy >= 0.0 {
            2
        } else {
            0
        };
        if x1 > x0 {
            crossings += inc;
        } else {
            crossings -= inc;
        }
    }
    crossings != 0
}

/// Outline of the sub-grid `[imin, imax] x [jmin, jmax]`, counter-clockwise
/// in index space.
fn outline(
    lon: &Array2,
    lat: &Array2,
    imin: usize,
    imax: usize,
    jmin: usize,
    jmax: usize,
) -> (Vec<f64>, Vec<f64>) {
    let nb = 2 * (jmax - jmin + imax - imin);
    let mut xb = Vec::with_capacity(nb);
    let mut yb = Vec::with_capacity(nb);
    let mut push = |j: usize, i: usize| {
        xb.push(lon.get(j, i));
        yb.push(lat.get(j, i));
    };
    for i in imin..imax {
        push(jmin, i);
    }
    for j in jmin..jmax {
        push(j, imax);
    }
    for i in (imin + 1..=imax).rev() {
        push(jmax, i);
    }
    for j in (jmin + 1..=jmax).rev() {
        push(j, imin);
    }
    (xb, yb)
}

/// Whether `(x, y)` lies inside the outline of a sub-grid.
pub fn inside_subgrid(
    lon: &Array2,
    lat: &Array2,
    (imin, imax): (usize, usize),
    (jmin, jmax): (usize, usize),
    x: f64,
    y: f64,
) -> bool {
    let (xb, yb) = outline(lon, lat, imin, imax, jmin, jmax);
    point_in_polygon(&xb, &yb, x, y)
}

/// Fractional grid coordinates of a geographic point.
///
/// Returns `None` when the point lies outside the outline of the whole grid.
pub fn locate(lon: &Array2, lat: &Array2, lon_p: f64, lat_p: f64) -> Option<(f64, f64)> {
    let (ny, nx) = (lon.ny(), lon.nx());
    if nx < 2 || ny < 2 || !lon_p.is_finite() || !lat_p.is_finite() {
        return None;
    }
    let (mut imin, mut imax) = (0, nx - 1);
    let (mut jmin, mut jmax) = (0, ny - 1);
    if !inside_subgrid(lon, lat, (imin, imax), (jmin, jmax), lon_p, lat_p) {
        return None;
    }

    while imax - imin > 1 || jmax - jmin > 1 {
        if imax - imin > 1 {
            let i0 = (imin + imax) / 2;
            if inside_subgrid(lon, lat, (imin, i0), (jmin, jmax), lon_p, lat_p) {
                imax = i0;
            } else {
                imin = i0;
            }
        }
        if jmax - jmin > 1 {
            let j0 = (jmin + jmax) / 2;
            if inside_subgrid(lon, lat, (imin, imax), (jmin, j0), lon_p, lat_p) {
                jmax = j0;
            } else {
                jmin = j0;
            }
        }
    }

    Some(refine(lon, lat, imin, jmin, lon_p, lat_p))
}

/// Invert the bilinear map of cell `(imin, jmin)` along its two edges.
fn refine(lon: &Array2, lat: &Array2, imin: usize, jmin: usize, x: f64, y: f64) -> (f64, f64) {
    let lon0 = lon.get(jmin, imin);
    let lat0 = lat.get(jmin, imin);
    let dy1 = lat.get(jmin + 1, imin) - lat0;
    let dx1 = lon.get(jmin + 1, imin) - lon0;
    let dy2 = lat.get(jmin, imin + 1) - lat0;
    let dx2 = lon.get(jmin, imin + 1) - lon0;
    let det = dx2 * dy1 - dy2 * dx1;

    let c1 = x * dy1 - y * dx1;
    let c2 = lon0 * dy2 - lat0 * dx2;
    let deltax = ((c1 * dx2 - c2 * dx1) / det - lon0) / dx2;

    let c1 = lon0 * dy1 - lat0 * dx1;
    let c2 = x * dy2 - y * dx2;
    let deltay = ((c1 * dy2 - c2 * dy1) / det - lat0) / dy1;

    (imin as f64 + unit(deltax), jmin as f64 + unit(deltay))
}

#[inline]
fn unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn regular(nx: usize, ny: usize) -> (Array2, Array2) {
        let lon = Array2::from_fn(ny, nx, |_, i| -5.0 + 0.5 * i as f64);
        let lat = Array2::from_fn(ny, nx, |j, _| 40.0 + 0.25 * j as f64);
        (lon, lat)
    }

    #[test]
    fn test_square_containment() {
        let xb = [0.0, 1.0, 1.0, 0.0];
        let yb = [0.0, 0.0, 1.0, 1.0];
        assert!(point_in_polygon(&xb, &yb, 0.5, 0.5));
        assert!(!point_in_polygon(&xb, &yb, 1.5, 0.5));
        assert!(!point_in_polygon(&xb, &yb, 0.5, -0.1));
    }

    #[test]
    fn test_boundary_points_are_inside() {
        let xb = [0.0, 1.0, 1.0, 0.0];
        let yb = [0.0, 0.0, 1.0, 1.0];
        // Vertex.
        assert!(point_in_polygon(&xb, &yb, 1.0, 1.0));
        // Edges.
        assert!(point_in_polygon(&xb, &yb, 0.5, 0.0));
        assert!(point_in_polygon(&xb, &yb, 0.5, 1.0));
    }

    #[test]
    fn test_grid_node_is_inside() {
        let (lon, lat) = regular(10, 8);
        let node = (lon.get(0, 3), lat.get(0, 3));
        assert!(inside_subgrid(&lon, &lat, (0, 9), (0, 7), node.0, node.1));
    }

    #[test]
    fn test_locate_on_regular_grid() {
        let (lon, lat) = regular(10, 8);
        let (x, y) = locate(&lon, &lat, -3.75, 41.0).unwrap();
        assert_relative_eq!(x, 2.5, epsilon = 1e-9);
        assert_relative_eq!(y, 4.0, epsilon = 1e-9);

        let (x, y) = locate(&lon, &lat, -1.2, 40.3).unwrap();
        assert_relative_eq!(x, 7.6, epsilon = 1e-9);
        assert_relative_eq!(y, 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_locate_outside() {
        let (lon, lat) = regular(10, 8);
        assert!(locate(&lon, &lat, -6.0, 41.0).is_none());
        assert!(locate(&lon, &lat, -3.0, 45.0).is_none());
    }

    #[test]
    fn test_locate_on_rotated_grid() {
        // Grid rotated by a shear: lon depends on both indices.
        let lon = Array2::from_fn(6, 6, |j, i| i as f64 + 0.2 * j as f64);
        let lat = Array2::from_fn(6, 6, |j, _| j as f64);
        let (x, y) = locate(&lon, &lat, 2.5 + 0.2 * 3.25, 3.25).unwrap();
        assert_relative_eq!(x, 2.5, epsilon = 1e-9);
        assert_relative_eq!(y, 3.25, epsilon = 1e-9);
    }
}
