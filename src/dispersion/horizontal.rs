//! Horizontal turbulent dispersion.
//!
//! Random walk with a diffusivity following Richardson's 4/3 law,
//! `Kh = epsilon^(1/3) * l^(4/3)`, where `l` is the local cell size. A
//! step of `dt` seconds moves the particle by
//!
//! ```text
//! dX = R * sqrt(2 * Kh * |dt|) = R * sqrt(2 |dt|) * epsilon^(1/6) * l^(2/3)
//! ```
//!
//! meters per axis, with `R` uniform in `[-1, 1)`, before conversion to
//! grid units with the metric of each axis.

use std::str::FromStr;

use rand::Rng;

use crate::grid::GridGeometry;
use crate::types::{Displacement, GridPoint};

/// Turbulent dissipation rate used when none is configured (m²/s³).
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// How the random factor is drawn for the two axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispersionDraw {
    /// One draw shared by both axes.
    #[default]
    Shared,
    /// One draw per axis.
    Independent,
}

impl FromStr for DispersionDraw {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" | "single" => Ok(Self::Shared),
            "independent" | "per_axis" => Ok(Self::Independent),
            other => Err(format!("unknown dispersion draw '{}'", other)),
        }
    }
}

/// Horizontal dispersion parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HorizontalDispersion {
    /// Turbulent dissipation rate (m²/s³).
    pub epsilon: f64,
    pub draw: DispersionDraw,
    /// Draws tried before giving up on a step that lands on land.
    pub attempts: usize,
}

impl Default for HorizontalDispersion {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            draw: DispersionDraw::Shared,
            attempts: 5,
        }
    }
}

impl HorizontalDispersion {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            ..Self::default()
        }
    }

    pub fn with_draw(mut self, draw: DispersionDraw) -> Self {
        self.draw = draw;
        self
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Horizontal diffusivity (m²/s) for a cell size in meters.
    pub fn diffusivity(&self, cell_size: f64) -> f64 {
        self.epsilon.cbrt() * cell_size.powf(4.0 / 3.0)
    }

    /// Amplitude in meters of a step, `sqrt(2 Kh |dt|)`.
    pub fn amplitude(&self, cell_size: f64, dt: f64) -> f64 {
        (2.0 * dt.abs()).sqrt() * self.epsilon.powf(1.0 / 6.0) * cell_size.powf(2.0 / 3.0)
    }

    /// Random horizontal displacement in grid units.
    ///
    /// Draws are repeated until the displaced particle is in water, up to
    /// [`attempts`](Self::attempts) times; after that the particle stays put.
    pub fn displacement<R: Rng + ?Sized>(
        &self,
        geometry: &GridGeometry,
        p: GridPoint,
        dt: f64,
        rng: &mut R,
    ) -> Displacement {
        let i = (p.x.round().max(0.0) as usize).min(geometry.nx() - 1);
        let j = (p.y.round().max(0.0) as usize).min(geometry.ny() - 1);
        let metrics = geometry.metrics();
        let (dx, dy) = (metrics.dx_t(j, i), metrics.dy_t(j, i));
        let amplitude = self.amplitude(0.5 * (dx + dy), dt);

        for _ in 0..self.attempts {
            let rx: f64 = rng.gen_range(-1.0..1.0);
            let ry = match self.draw {
                DispersionDraw::Shared => rx,
                DispersionDraw::Independent => rng.gen_range(-1.0..1.0),
            };
            let d = Displacement::new(rx * amplitude / dx, ry * amplitude / dy, 0.0);
            if geometry.is_in_water_at(p + d) {
                return d;
            }
        }
        Displacement::ZERO
    }
}
