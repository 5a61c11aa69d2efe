//! Particle advection by the resolved currents.
//!
//! The velocity field is reached through the [`VelocityField`] seam, which
//! returns velocities already converted to grid units per second. Two
//! steppers integrate it:
//!
//! | Scheme | Stages | Notes |
//! |--------|--------|-------|
//! | [`Euler`] | 1 | first order |
//! | [`RungeKutta4`] | 4 | stops at the domain edge with a partial step |
//!
//! [`Advection`] adds the run options on top: forward or backward time,
//! horizontal and vertical switches, and CFL warnings.
//!
//! Backward runs take a predictor step first and, when the predicted
//! position is still inside the domain, restart the step from there. A
//! predicted position on the edge ends the trajectory.
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::advection::{Advection, AdvectionScheme};
//! use ichthyop_rs::dataset::synthetic::FlatCurrent;
//! use ichthyop_rs::types::GridPoint;
//!
//! let scenario = FlatCurrent::new(10, 10, 5).with_u(1.0);
//! let mut dataset = scenario.dataset().unwrap();
//! dataset.init(0.0).unwrap();
//!
//! let advection = Advection::new(AdvectionScheme::Euler);
//! let d = advection
//!     .displacement(&dataset, GridPoint::new(4.5, 4.5, 2.0), 0.0, 600.0)
//!     .unwrap();
//! assert!((d.dx - 600.0 / scenario.dx()).abs() < 1e-9);
//! ```

mod stepper;

pub use stepper::{AdvectionStepper, Euler, RungeKutta4};

use std::fmt;
use std::str::FromStr;

use log::warn;
use thiserror::Error;

use crate::analysis::CflThresholds;
use crate::grid::GridGeometry;
use crate::interpolation::InterpolationError;
use crate::types::{Displacement, GridPoint};

/// Error type for a particle step.
///
/// Every variant ends the trajectory of one particle; none of them stops
/// the run.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TransportError {
    /// A velocity sample failed (stencil outside the loaded domain)
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    /// Backward predictor left the domain
    #[error("particle reached the domain edge at {0}")]
    Edge(GridPoint),
}

/// Velocity field seen by the steppers.
pub trait VelocityField {
    fn geometry(&self) -> &GridGeometry;

    /// Velocity at `p` and `time`, in grid units per second.
    fn grid_velocity(&self, p: GridPoint, time: f64) -> Result<Displacement, InterpolationError>;
}

/// Numerical scheme of the advection step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdvectionScheme {
    Euler,
    #[default]
    Rk4,
}

impl AdvectionScheme {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euler => Euler.name(),
            Self::Rk4 => RungeKutta4.name(),
        }
    }
}

impl fmt::Display for AdvectionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AdvectionScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euler" | "forward_euler" => Ok(Self::Euler),
            "rk4" | "runge_kutta" | "runge_kutta_4" => Ok(Self::Rk4),
            other => Err(format!("unknown advection scheme '{}'", other)),
        }
    }
}

/// Advection step with its run options.
#[derive(Clone, Debug)]
pub struct Advection {
    scheme: AdvectionScheme,
    horizontal: bool,
    vertical: bool,
    cfl: CflThresholds,
    warn_cfl: bool,
}

impl Default for Advection {
    fn default() -> Self {
        Self::new(AdvectionScheme::default())
    }
}

impl Advection {
    pub fn new(scheme: AdvectionScheme) -> Self {
        Self {
            scheme,
            horizontal: true,
            vertical: true,
            cfl: CflThresholds::default(),
            warn_cfl: true,
        }
    }

    /// Enable or disable horizontal motion.
    pub fn with_horizontal(mut self, enabled: bool) -> Self {
        self.horizontal = enabled;
        self
    }

    /// Enable or disable vertical motion.
    pub fn with_vertical(mut self, enabled: bool) -> Self {
        self.vertical = enabled;
        self
    }

    pub fn with_cfl(mut self, cfl: CflThresholds) -> Self {
        self.cfl = cfl;
        self
    }

    /// Log every displacement above the CFL thresholds (on by default).
    pub fn with_cfl_warnings(mut self, enabled: bool) -> Self {
        self.warn_cfl = enabled;
        self
    }

    pub fn scheme(&self) -> AdvectionScheme {
        self.scheme
    }

    pub fn cfl(&self) -> &CflThresholds {
        &self.cfl
    }

    /// Displacement of a particle at `p` over `dt` seconds (negative
    /// backward in time).
    pub fn displacement<F: VelocityField + ?Sized>(
        &self,
        field: &F,
        p: GridPoint,
        time: f64,
        dt: f64,
    ) -> Result<Displacement, TransportError> {
        let mut d = if dt >= 0.0 {
            self.step(field, p, time, dt)?
        } else {
            let predicted = p + self.step(field, p, time, dt)?;
            if field.geometry().is_on_edge(predicted) {
                return Err(TransportError::Edge(predicted));
            }
            self.step(field, predicted, time, dt)?
        };

        if !self.horizontal {
            d.dx = 0.0;
            d.dy = 0.0;
        }
        if !self.vertical || field.geometry().nz() < 2 {
            d.dz = 0.0;
        }
        self.report_cfl(p, d);
        Ok(d)
    }

    /// One step of the configured scheme.
    pub fn step<F: VelocityField + ?Sized>(
        &self,
        field: &F,
        p: GridPoint,
        time: f64,
        dt: f64,
    ) -> Result<Displacement, TransportError> {
        match self.scheme {
            AdvectionScheme::Euler => Euler.step(field, p, time, dt),
            AdvectionScheme::Rk4 => RungeKutta4.step(field, p, time, dt),
        }
    }

    /// One step of the configured scheme, logging CFL exceedance.
    ///
    /// Unlike [`displacement`](Self::displacement), `dt < 0` runs the
    /// stepper directly, without the backward predictor.
    pub fn checked_step<F: VelocityField + ?Sized>(
        &self,
        field: &F,
        p: GridPoint,
        time: f64,
        dt: f64,
    ) -> Result<Displacement, TransportError> {
        let d = self.step(field, p, time, dt)?;
        self.report_cfl(p, d);
        Ok(d)
    }

    fn report_cfl(&self, p: GridPoint, d: Displacement) {
        if !self.warn_cfl {
            return;
        }
        let limit = self.cfl.max_horizontal;
        if d.dx.abs() > limit {
            warn!("CFL broken for U: {:.3} cells at {}", d.dx, p);
        }
        if d.dy.abs() > limit {
            warn!("CFL broken for V: {:.3} cells at {}", d.dy, p);
        }
        if d.dz.abs() > self.cfl.max_vertical {
            warn!("CFL broken for W: {:.3} levels at {}", d.dz, p);
        }
    }
}
