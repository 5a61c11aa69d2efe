//! Vertical turbulent dispersion.
//!
//! Random displacement model with drift correction (Visser 1997):
//!
//! ```text
//! dz = K'(z) |dt| + R sqrt(6 K(z + K'(z) |dt| / 2) |dt|)
//! ```
//!
//! with `R` uniform in `[-1, 1)`. The drift term moves particles toward
//! higher diffusivity and keeps an initially uniform distribution uniform
//! when `K` varies with depth. `K` is rebuilt per column from its w-level
//! values with [`KvSpline`], averaged over the horizontal stencil of the
//! particle, and the displacement is converted to grid units with the
//! thickness of the particle's cell.

use rand::Rng;

use super::spline::KvSpline;
use crate::grid::GridGeometry;
use crate::types::{Displacement, GridPoint};

/// Source of vertical diffusivity profiles.
pub trait DiffusivityProfile {
    fn geometry(&self) -> &GridGeometry;

    /// Diffusivity (m²/s) on the `nz + 1` w levels of column `(j, i)` at
    /// `time`, bottom first; `None` when no diffusivity is available.
    fn kv_column(&self, j: usize, i: usize, time: f64) -> Option<Vec<f64>>;
}

/// Reflect a vertical displacement off the bottom (`z = 0`) and the
/// surface (`z = nz - 1`).
pub fn reflect(z: f64, dz: f64, nz: usize) -> f64 {
    let top = nz.saturating_sub(1) as f64;
    let target = z + dz;
    if target < 0.0 {
        -(2.0 * z + dz)
    } else if target > top {
        2.0 * (top - z) - dz
    } else {
        dz
    }
}

/// Stencil-averaged drift and diffusivity at a particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KvSample {
    /// `K'(z)`, in m/s.
    pub drift: f64,
    /// `K` at the half-step position, in m²/s.
    pub kv: f64,
}

/// Vertical dispersion step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VerticalDispersion;

impl VerticalDispersion {
    pub fn new() -> Self {
        Self
    }

    /// Drift and half-step diffusivity averaged over the horizontal stencil.
    ///
    /// Near the coast only the nearest column is used. Missing samples in a
    /// column (fill values under a sloping bottom) count as zero
    /// diffusivity. `None` when no column of the stencil has a profile.
    pub fn sample<F: DiffusivityProfile + ?Sized>(
        &self,
        field: &F,
        p: GridPoint,
        time: f64,
        dt: f64,
    ) -> Option<KvSample> {
        let geometry = field.geometry();
        let nz = geometry.nz();
        if nz < 2 {
            return None;
        }
        let depth = geometry.z_to_depth(p.x, p.y, p.z);
        let (n, i0, j0) = if geometry.is_close_to_coast(p) {
            (1, p.x.round(), p.y.round())
        } else {
            (2, p.x.floor(), p.y.floor())
        };
        let (dx, dy) = (p.x - i0, p.y - j0);

        let mut drift = 0.0;
        let mut kv = 0.0;
        let mut total = 0.0;
        for jj in 0..n {
            for ii in 0..n {
                let co = ((1.0 - ii as f64 - dx) * (1.0 - jj as f64 - dy)).abs();
                if co == 0.0 {
                    continue;
                }
                let i = geometry.horizontal().wrap_i(i0 as isize + ii as isize);
                let j = j0 as isize + jj as isize;
                if !geometry.is_in_water(nz as isize - 1, j, i) {
                    continue;
                }
                let (i, j) = (i as usize, j as usize);
                let Some(values) = field.kv_column(j, i, time) else {
                    continue;
                };
                if values.len() != nz + 1 {
                    continue;
                }
                let depths = (0..=nz).map(|kw| geometry.face_depth(kw, j, i)).collect();
                let values = values
                    .into_iter()
                    .map(|v| if v.is_finite() { v } else { 0.0 })
                    .collect();
                let Some(spline) = KvSpline::new(depths, values) else {
                    continue;
                };
                let (slope, predicted) = spline.drift_and_predicted(depth, dt.abs());
                drift += co * slope;
                kv += co * predicted;
                total += co;
            }
        }
        (total > 0.0).then(|| KvSample {
            drift: drift / total,
            kv: kv / total,
        })
    }

    /// Random vertical displacement in grid units, reflected into the
    /// water column.
    pub fn displacement<F, R>(
        &self,
        field: &F,
        p: GridPoint,
        time: f64,
        dt: f64,
        rng: &mut R,
    ) -> Displacement
    where
        F: DiffusivityProfile + ?Sized,
        R: Rng + ?Sized,
    {
        let Some(sample) = self.sample(field, p, time, dt) else {
            return Displacement::ZERO;
        };
        let geometry = field.geometry();
        let nz = geometry.nz();
        let dt = dt.abs();
        let r: f64 = rng.gen_range(-1.0..1.0);
        let meters = sample.drift * dt + r * (6.0 * sample.kv * dt).sqrt();

        let k = (p.z.round().max(0.0) as usize).min(nz - 1);
        let j = (p.y.round().max(0.0) as usize).min(geometry.ny() - 1);
        let i = geometry.horizontal().wrap_i(p.x.round() as isize).max(0) as usize;
        let thickness = geometry.cell_thickness(k, j, i.min(geometry.nx() - 1));
        if !(thickness > 0.0) || !meters.is_finite() {
            return Displacement::ZERO;
        }
        Displacement::new(0.0, 0.0, reflect(p.z, meters / thickness, nz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::grid::{HorizontalGrid, HorizontalMetrics, LandMask};
    use crate::vertical::{VerticalGrid, ZLevels};

    /// Five 10 m layers; diffusivity given as a function of face depth.
    struct Profile {
        geometry: GridGeometry,
        kv: fn(f64) -> f64,
    }

    impl Profile {
        fn new(kv: fn(f64) -> f64) -> Self {
            let lon = (0..8).map(|i| i as f64 * 0.01).collect();
            let lat = (0..8).map(|j| j as f64 * 0.01).collect();
            let geometry = GridGeometry::new(
                HorizontalGrid::rectilinear(lon, lat, false).unwrap(),
                HorizontalMetrics::uniform(8, 8, 1000.0, 1000.0),
                VerticalGrid::ZLevels(ZLevels::uniform(5, 50.0).unwrap()),
                LandMask::all_wet(5, 8, 8),
            )
            .unwrap();
            Self { geometry, kv }
        }
    }

    impl DiffusivityProfile for Profile {
        fn geometry(&self) -> &GridGeometry {
            &self.geometry
        }

        fn kv_column(&self, j: usize, i: usize, _time: f64) -> Option<Vec<f64>> {
            let nz = self.geometry.nz();
            Some(
                (0..=nz)
                    .map(|kw| (self.kv)(self.geometry.face_depth(kw, j, i)))
                    .collect(),
            )
        }
    }

    #[test]
    fn test_reflection() {
        assert_relative_eq!(reflect(0.0, -0.3, 5), 0.3);
        assert_relative_eq!(reflect(0.2, -0.5, 5), -(0.4 - 0.5));
        assert_relative_eq!(reflect(4.0, 0.5, 5), -0.5);
        assert_relative_eq!(reflect(2.0, 0.4, 5), 0.4);
        let z = 0.0;
        let dz = reflect(z, -1.7, 5);
        assert!(z + dz >= 0.0 && z + dz <= 4.0);
    }

    #[test]
    fn test_no_diffusivity_no_motion() {
        let profile = Profile::new(|_| 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let d = VerticalDispersion.displacement(
            &profile,
            GridPoint::new(3.5, 3.5, 2.0),
            0.0,
            1800.0,
            &mut rng,
        );
        assert_eq!(d, Displacement::ZERO);
    }

    #[test]
    fn test_uniform_diffusivity_has_no_drift() {
        let profile = Profile::new(|_| 0.01);
        let sample = VerticalDispersion
            .sample(&profile, GridPoint::new(3.3, 2.6, 1.7), 0.0, 600.0)
            .unwrap();
        assert_relative_eq!(sample.drift, 0.0, epsilon = 1e-15);
        assert_relative_eq!(sample.kv, 0.01, epsilon = 1e-12);

        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let d = VerticalDispersion.displacement(
            &profile,
            GridPoint::new(3.3, 2.6, 2.0),
            0.0,
            600.0,
            &mut rng,
        );
        assert!(d.dz.abs() <= (6.0 * 0.01 * 600.0f64).sqrt() / 10.0);
        assert_eq!((d.dx, d.dy), (0.0, 0.0));
    }

    #[test]
    fn test_linear_profile_drift() {
        // K = 0.001 * (50 + depth): zero at the bottom, 0.05 at the surface.
        let profile = Profile::new(|depth| 0.001 * (50.0 + depth));
        let p = GridPoint::new(3.0, 3.0, 2.0);
        let dt = 100.0;
        let sample = VerticalDispersion.sample(&profile, p, 0.0, dt).unwrap();
        assert_relative_eq!(sample.drift, 0.001, epsilon = 1e-12);
        let depth = profile.geometry.z_to_depth(p.x, p.y, p.z);
        let expected = 0.001 * (50.0 + depth + 0.5 * 0.001 * dt);
        assert_relative_eq!(sample.kv, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_backward_step_uses_magnitude() {
        let profile = Profile::new(|depth| 0.001 * (50.0 + depth));
        let p = GridPoint::new(3.0, 3.0, 2.0);
        let forward = VerticalDispersion.sample(&profile, p, 0.0, 100.0).unwrap();
        let backward = VerticalDispersion.sample(&profile, p, 0.0, -100.0).unwrap();
        assert_eq!(forward, backward);
    }
}
