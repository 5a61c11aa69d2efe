//! Terrain-following s-coordinate.
//!
//! The s-coordinate maps each water column onto `nz` layers whose depth
//! follows the local bathymetry `h`. Two transforms are in use:
//!
//! ```text
//! standard: z = hc (s - Cs) + Cs h
//! UCLA:     z = h (s hc + Cs h) / (hc + h)
//! ```
//!
//! with `s` the uniform coordinate of the level and `Cs` the stretching
//! curve. The free surface shifts the column as
//! `z = z0 + ζ (1 + z0 / h)`.
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::vertical::{SCoordinate, SCoordinateMode, SongHaidvogelStretching};
//!
//! let s = SCoordinate::from_stretching(
//!     SCoordinateMode::Standard,
//!     50.0,
//!     30,
//!     &SongHaidvogelStretching::new(6.0, 0.4),
//! );
//! let h = 400.0;
//! assert!((s.z_w(0, h) + h).abs() < 1e-9);
//! assert_eq!(s.z_w(30, h), 0.0);
//! assert!(s.z_r(0, h) < s.z_r(29, h));
//! ```

use std::fmt;

use super::stretching::{sc_r, sc_w, Stretching};
use crate::grid::{Array2, Array3, GridError};

/// Free-surface value that archives use for "no data".
const ZETA_MISSING: f64 = 999.0;

/// Vertical transform selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SCoordinateMode {
    /// Rutgers/standard transform.
    #[default]
    Standard,
    /// UCLA (generalized) transform.
    Ucla,
}

impl fmt::Display for SCoordinateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Ucla => write!(f, "ucla"),
        }
    }
}

/// S-coordinate definition: transform, critical depth and stretching curves.
#[derive(Clone, Debug)]
pub struct SCoordinate {
    mode: SCoordinateMode,
    hc: f64,
    /// Stretching at rho levels, bottom first, length `nz`.
    cs_r: Vec<f64>,
    /// Stretching at w levels, bottom first, length `nz + 1`.
    cs_w: Vec<f64>,
}

impl SCoordinate {
    /// Build from tabulated stretching curves.
    pub fn new(
        mode: SCoordinateMode,
        hc: f64,
        cs_r: Vec<f64>,
        cs_w: Vec<f64>,
    ) -> Result<Self, GridError> {
        if cs_r.is_empty() {
            return Err(GridError::Vertical("empty Cs_r curve".into()));
        }
        if cs_w.len() != cs_r.len() + 1 {
            return Err(GridError::Vertical(format!(
                "Cs_w has {} values, expected {}",
                cs_w.len(),
                cs_r.len() + 1
            )));
        }
        if !hc.is_finite() || hc < 0.0 {
            return Err(GridError::Vertical(format!("invalid critical depth hc={}", hc)));
        }
        Ok(Self {
            mode,
            hc,
            cs_r,
            cs_w,
        })
    }

    /// Build from a parametric stretching curve.
    pub fn from_stretching(
        mode: SCoordinateMode,
        hc: f64,
        nz: usize,
        stretching: &dyn Stretching,
    ) -> Self {
        let (cs_r, cs_w) = stretching.curves(nz);
        Self {
            mode,
            hc,
            cs_r,
            cs_w,
        }
    }

    #[inline]
    pub fn nz(&self) -> usize {
        self.cs_r.len()
    }

    pub fn mode(&self) -> SCoordinateMode {
        self.mode
    }

    pub fn hc(&self) -> f64 {
        self.hc
    }

    #[inline]
    fn transform(&self, s: f64, cs: f64, h: f64) -> f64 {
        match self.mode {
            SCoordinateMode::Standard => self.hc * (s - cs) + cs * h,
            SCoordinateMode::Ucla => h * (s * self.hc + cs * h) / (self.hc + h),
        }
    }

    /// Resting depth of rho level `k` for bathymetry `h`.
    #[inline]
    pub fn z_r(&self, k: usize, h: f64) -> f64 {
        self.transform(sc_r(k, self.nz()), self.cs_r[k], h)
    }

    /// Resting depth of w level `k` for bathymetry `h`.
    ///
    /// The bottom and surface faces are pinned to `-h` and `0`.
    #[inline]
    pub fn z_w(&self, k: usize, h: f64) -> f64 {
        let nz = self.nz();
        if k == 0 {
            -h
        } else if k == nz {
            0.0
        } else {
            self.transform(sc_w(k, nz), self.cs_w[k], h)
        }
    }

    /// Shift a resting depth by the free surface `zeta`.
    ///
    /// Missing free-surface values (NaN or 999) count as zero.
    #[inline]
    pub fn with_free_surface(z: f64, h: f64, zeta: f64) -> f64 {
        if !zeta.is_finite() || zeta == ZETA_MISSING || h == 0.0 {
            z
        } else {
            z + zeta * (1.0 + z / h)
        }
    }

    /// Resting rho and w depths over a whole bathymetry.
    pub fn resting_levels(&self, h: &Array2) -> (Array3, Array3) {
        let nz = self.nz();
        let z_r = Array3::from_fn(nz, h.ny(), h.nx(), |k, j, i| self.z_r(k, h.get(j, i)));
        let z_w = Array3::from_fn(nz + 1, h.ny(), h.nx(), |k, j, i| {
            self.z_w(k, h.get(j, i))
        });
        (z_r, z_w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertical::UniformStretching;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_standard_is_sigma() {
        // With Cs = s the standard transform reduces to z = s h.
        let s = SCoordinate::from_stretching(SCoordinateMode::Standard, 10.0, 4, &UniformStretching);
        assert_relative_eq!(s.z_r(0, 100.0), -87.5, epsilon = 1e-12);
        assert_relative_eq!(s.z_w(2, 100.0), -50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ucla_bounds() {
        let s = SCoordinate::from_stretching(SCoordinateMode::Ucla, 20.0, 10, &UniformStretching);
        let h = 150.0;
        assert_relative_eq!(s.z_w(0, h), -h);
        assert_eq!(s.z_w(10, h), 0.0);
        for k in 0..10 {
            assert!(s.z_r(k, h) > s.z_w(k, h) && s.z_r(k, h) < s.z_w(k + 1, h));
        }
    }

    #[test]
    fn test_free_surface_stretches_column() {
        let h = 100.0;
        assert_relative_eq!(SCoordinate::with_free_surface(-h, h, 2.0), -h);
        assert_relative_eq!(SCoordinate::with_free_surface(0.0, h, 2.0), 2.0);
        assert_relative_eq!(SCoordinate::with_free_surface(-50.0, h, 2.0), -49.0);
        assert_eq!(SCoordinate::with_free_surface(-50.0, h, 999.0), -50.0);
        assert_eq!(SCoordinate::with_free_surface(-50.0, h, f64::NAN), -50.0);
    }

    #[test]
    fn test_rejects_mismatched_curves() {
        let result = SCoordinate::new(SCoordinateMode::Standard, 10.0, vec![-0.5], vec![-1.0]);
        assert!(matches!(result, Err(GridError::Vertical(_))));
    }
}
