//! Explicit steppers for particle advection.
//!
//! A stepper turns the velocity field into one displacement over `dt`.
//! Velocities are sampled in grid units per second, so the displacement
//! comes out in grid units directly.

use super::{TransportError, VelocityField};
use crate::types::{Displacement, GridPoint};

// =============================================================================
// AdvectionStepper Trait
// =============================================================================

/// Explicit one-step scheme.
pub trait AdvectionStepper: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Order of accuracy.
    fn order(&self) -> usize;

    /// Displacement of a particle at `p` from `time` to `time + dt`.
    fn step<F: VelocityField + ?Sized>(
        &self,
        field: &F,
        p: GridPoint,
        time: f64,
        dt: f64,
    ) -> Result<Displacement, TransportError>;
}

/// Velocity at `p` times `dt`.
#[inline]
fn sample<F: VelocityField + ?Sized>(
    field: &F,
    p: GridPoint,
    time: f64,
    dt: f64,
) -> Result<Displacement, TransportError> {
    Ok(field.grid_velocity(p, time)? * dt)
}

// =============================================================================
// Forward Euler
// =============================================================================

/// Forward Euler: one velocity sample at the start of the step.
#[derive(Clone, Copy, Debug, Default)]
pub struct Euler;

impl AdvectionStepper for Euler {
    fn name(&self) -> &'static str {
        "Euler"
    }

    fn order(&self) -> usize {
        1
    }

    fn step<F: VelocityField + ?Sized>(
        &self,
        field: &F,
        p: GridPoint,
        time: f64,
        dt: f64,
    ) -> Result<Displacement, TransportError> {
        sample(field, p, time, dt)
    }
}

// =============================================================================
// Classic Runge-Kutta
// =============================================================================

/// Classic four-stage Runge-Kutta.
///
/// Stages are evaluated at `t`, `t + dt/2`, `t + dt/2` and `t + dt`. When an
/// intermediate position falls on the domain edge, the step stops there
/// and returns the horizontal part of the partial displacement that
/// reached it, with no vertical motion.
#[derive(Clone, Copy, Debug, Default)]
pub struct RungeKutta4;

impl AdvectionStepper for RungeKutta4 {
    fn name(&self) -> &'static str {
        "RK4"
    }

    fn order(&self) -> usize {
        4
    }

    fn step<F: VelocityField + ?Sized>(
        &self,
        field: &F,
        p0: GridPoint,
        time: f64,
        dt: f64,
    ) -> Result<Displacement, TransportError> {
        let geometry = field.geometry();
        let half = 0.5 * dt;

        let k1 = sample(field, p0, time, dt)?;
        let partial = k1 * 0.5;
        if geometry.is_on_edge(p0 + partial) {
            return Ok(partial.horizontal());
        }

        let k2 = sample(field, p0 + partial, time + half, dt)?;
        let partial = k2 * 0.5;
        if geometry.is_on_edge(p0 + partial) {
            return Ok(partial.horizontal());
        }

        let k3 = sample(field, p0 + partial, time + half, dt)?;
        if geometry.is_on_edge(p0 + k3) {
            return Ok(k3.horizontal());
        }

        let k4 = sample(field, p0 + k3, time + dt, dt)?;
        Ok((k1 + k2 * 2.0 + k3 * 2.0 + k4) * (1.0 / 6.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::grid::{GridGeometry, HorizontalGrid, HorizontalMetrics, LandMask};
    use crate::interpolation::InterpolationError;
    use crate::vertical::{VerticalGrid, ZLevels};

    /// Analytic velocity field in grid units per second.
    struct Analytic {
        geometry: GridGeometry,
        velocity: fn(GridPoint, f64) -> Displacement,
    }

    impl Analytic {
        fn new(velocity: fn(GridPoint, f64) -> Displacement) -> Self {
            let lon = (0..20).map(|i| i as f64 * 0.01).collect();
            let lat = (0..20).map(|j| j as f64 * 0.01).collect();
            let geometry = GridGeometry::new(
                HorizontalGrid::rectilinear(lon, lat, false).unwrap(),
                HorizontalMetrics::uniform(20, 20, 1000.0, 1000.0),
                VerticalGrid::ZLevels(ZLevels::uniform(4, 40.0).unwrap()),
                LandMask::all_wet(4, 20, 20),
            )
            .unwrap();
            Self { geometry, velocity }
        }
    }

    impl VelocityField for Analytic {
        fn geometry(&self) -> &GridGeometry {
            &self.geometry
        }

        fn grid_velocity(&self, p: GridPoint, time: f64) -> Result<Displacement, InterpolationError> {
            Ok((self.velocity)(p, time))
        }
    }

    #[test]
    fn test_euler_uniform_flow() {
        let field = Analytic::new(|_, _| Displacement::new(1e-4, -2e-4, 0.0));
        let d = Euler.step(&field, GridPoint::new(10.0, 10.0, 1.0), 0.0, 3600.0).unwrap();
        assert_relative_eq!(d.dx, 0.36, epsilon = 1e-12);
        assert_relative_eq!(d.dy, -0.72, epsilon = 1e-12);
        assert_eq!(d.dz, 0.0);
    }

    #[test]
    fn test_rk4_matches_uniform_flow() {
        let field = Analytic::new(|_, _| Displacement::new(1e-4, 5e-5, 1e-5));
        let e = Euler.step(&field, GridPoint::new(10.0, 10.0, 1.0), 0.0, 3600.0).unwrap();
        let r = RungeKutta4
            .step(&field, GridPoint::new(10.0, 10.0, 1.0), 0.0, 3600.0)
            .unwrap();
        assert_relative_eq!(e.dx, r.dx, epsilon = 1e-12);
        assert_relative_eq!(e.dy, r.dy, epsilon = 1e-12);
        assert_relative_eq!(e.dz, r.dz, epsilon = 1e-12);
    }

    #[test]
    fn test_rk4_exact_for_time_linear_flow() {
        // u = a t: displacement a dt² / 2 from t = 0.
        let field = Analytic::new(|_, t| Displacement::new(1e-8 * t, 0.0, 0.0));
        let dt = 1000.0;
        let r = RungeKutta4.step(&field, GridPoint::new(5.0, 5.0, 1.0), 0.0, dt).unwrap();
        assert_relative_eq!(r.dx, 0.5 * 1e-8 * dt * dt, epsilon = 1e-12);
        let e = Euler.step(&field, GridPoint::new(5.0, 5.0, 1.0), 0.0, dt).unwrap();
        assert_eq!(e.dx, 0.0);
    }

    #[test]
    fn test_rk4_stops_at_edge() {
        // Fast eastward flow: the first half step reaches the edge.
        let field = Analytic::new(|_, _| Displacement::new(1e-3, 2e-4, 1e-5));
        let p = GridPoint::new(17.0, 10.0, 1.0);
        let dt = 3600.0;
        let r = RungeKutta4.step(&field, p, 0.0, dt).unwrap();
        assert!(field.geometry.is_on_edge(p + Displacement::new(1.8, 0.0, 0.0)));
        assert_relative_eq!(r.dx, 0.5 * 1e-3 * dt, epsilon = 1e-12);
        assert_relative_eq!(r.dy, 0.5 * 2e-4 * dt, epsilon = 1e-12);
        assert_eq!(r.dz, 0.0);
    }

    #[test]
    fn test_errors_propagate() {
        struct Failing(Analytic);
        impl VelocityField for Failing {
            fn geometry(&self) -> &GridGeometry {
                &self.0.geometry
            }
            fn grid_velocity(&self, _: GridPoint, _: f64) -> Result<Displacement, InterpolationError> {
                Err(InterpolationError::EmptyStencil { field: "u".into() })
            }
        }
        let field = Failing(Analytic::new(|_, _| Displacement::ZERO));
        let err = RungeKutta4
            .step(&field, GridPoint::new(5.0, 5.0, 1.0), 0.0, 60.0)
            .unwrap_err();
        assert!(matches!(err, TransportError::Interpolation(_)));
    }
}
