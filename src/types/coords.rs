//! Position newtypes for grid space and geographic space.
//!
//! Particles are tracked in fractional grid indices; the surrounding
//! bookkeeping reports them in geographic coordinates. Keeping the two
//! apart prevents feeding a longitude into an index computation.

use std::fmt;
use std::ops::{Add, Mul};

// =============================================================================
// GridPoint (fractional grid indices)
// =============================================================================

/// Fractional position in grid index space.
///
/// `x` runs along the i (xi) dimension, `y` along j (eta) and `z` along the
/// vertical level index k, with `k = 0` at the bottom and `k = nz - 1` at the
/// surface. Integer values sit on tracer (rho/T) points.
///
/// # Example
///
/// ```
/// use ichthyop_rs::types::{Displacement, GridPoint};
///
/// let p = GridPoint::new(4.5, 3.0, 2.0);
/// let q = p + Displacement::new(0.5, 0.0, -1.0);
/// assert_eq!(q, GridPoint::new(5.0, 3.0, 1.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GridPoint {
    /// Create a grid point.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Horizontal point on the given level.
    #[inline]
    pub const fn on_level(x: f64, y: f64, level: f64) -> Self {
        Self { x, y, z: level }
    }

    /// Nearest tracer node (rounded indices).
    #[inline]
    pub fn nearest_node(&self) -> (isize, isize, isize) {
        (
            self.x.round() as isize,
            self.y.round() as isize,
            self.z.round() as isize,
        )
    }

    /// True when every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add<Displacement> for GridPoint {
    type Output = GridPoint;

    #[inline]
    fn add(self, d: Displacement) -> GridPoint {
        GridPoint::new(self.x + d.dx, self.y + d.dy, self.z + d.dz)
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x={:.4}, y={:.4}, z={:.4})", self.x, self.y, self.z)
    }
}

// =============================================================================
// Displacement (grid units)
// =============================================================================

/// Particle displacement expressed in grid units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Displacement {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Displacement {
    /// No movement.
    pub const ZERO: Self = Self {
        dx: 0.0,
        dy: 0.0,
        dz: 0.0,
    };

    #[inline]
    pub const fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// Keep the horizontal part, drop the vertical one.
    #[inline]
    pub fn horizontal(self) -> Self {
        Self::new(self.dx, self.dy, 0.0)
    }

    /// Largest absolute component.
    pub fn max_abs(&self) -> f64 {
        self.dx.abs().max(self.dy.abs()).max(self.dz.abs())
    }
}

impl Add for Displacement {
    type Output = Displacement;

    #[inline]
    fn add(self, o: Displacement) -> Displacement {
        Displacement::new(self.dx + o.dx, self.dy + o.dy, self.dz + o.dz)
    }
}

impl Mul<f64> for Displacement {
    type Output = Displacement;

    #[inline]
    fn mul(self, c: f64) -> Displacement {
        Displacement::new(self.dx * c, self.dy * c, self.dz * c)
    }
}

// =============================================================================
// GeoPoint (longitude, latitude, depth)
// =============================================================================

/// Geographic position.
///
/// # Convention
///
/// `depth` is signed and **negative below the surface** (a particle 25 m
/// down has `depth = -25.0`), matching the vertical coordinate of the
/// ocean models.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeoPoint {
    /// Longitude in degrees east.
    pub lon: f64,
    /// Latitude in degrees north.
    pub lat: f64,
    /// Depth in meters, negative downward.
    pub depth: f64,
}

impl GeoPoint {
    pub const fn new(lon: f64, lat: f64, depth: f64) -> Self {
        Self { lon, lat, depth }
    }

    /// Surface position.
    pub const fn surface(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            depth: 0.0,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.5}°E, {:.5}°N, {:.2}m)",
            self.lon, self.lat, self.depth
        )
    }
}
