//! Transport options: time step, advection and dispersion.

use super::{ConfigError, ParameterSet};
use crate::advection::{Advection, AdvectionScheme};
use crate::analysis::CflThresholds;
use crate::dispersion::{DispersionDraw, HorizontalDispersion, DEFAULT_EPSILON};
use crate::simulation::CoastlineBehavior;

/// Configuration of the particle transport.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportConfig {
    /// Time step in seconds, negative for backward runs.
    pub dt: f64,
    pub scheme: AdvectionScheme,
    pub horizontal_advection: bool,
    pub vertical_advection: bool,
    /// `None` disables horizontal dispersion.
    pub horizontal_dispersion: Option<HorizontalDispersion>,
    pub vertical_dispersion: bool,
    /// Seed of the per-particle random streams; `None` seeds from entropy.
    pub seed: Option<u64>,
    pub cfl: CflThresholds,
    pub coastline: CoastlineBehavior,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            dt: 3600.0,
            scheme: AdvectionScheme::Rk4,
            horizontal_advection: true,
            vertical_advection: true,
            horizontal_dispersion: None,
            vertical_dispersion: false,
            seed: None,
            cfl: CflThresholds::default(),
            coastline: CoastlineBehavior::default(),
        }
    }
}

impl TransportConfig {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            ..Self::default()
        }
    }

    pub fn with_scheme(mut self, scheme: AdvectionScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_advection(mut self, horizontal: bool, vertical: bool) -> Self {
        self.horizontal_advection = horizontal;
        self.vertical_advection = vertical;
        self
    }

    pub fn with_horizontal_dispersion(mut self, dispersion: HorizontalDispersion) -> Self {
        self.horizontal_dispersion = Some(dispersion);
        self
    }

    pub fn with_vertical_dispersion(mut self, enabled: bool) -> Self {
        self.vertical_dispersion = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_cfl(mut self, cfl: CflThresholds) -> Self {
        self.cfl = cfl;
        self
    }

    pub fn with_coastline(mut self, coastline: CoastlineBehavior) -> Self {
        self.coastline = coastline;
        self
    }

    /// Advection step matching these options.
    pub fn advection(&self) -> Advection {
        Advection::new(self.scheme)
            .with_horizontal(self.horizontal_advection)
            .with_vertical(self.vertical_advection)
            .with_cfl(self.cfl)
    }

    /// Read the transport options.
    ///
    /// Keys: `time_step`, `scheme`, `horizontal_advection`,
    /// `vertical_advection`, `horizontal_dispersion`, `epsilon`,
    /// `dispersion_draw`, `vertical_dispersion`, `seed`, `cfl_threshold`,
    /// `coastline_behavior`.
    /// Absent keys keep their default.
    pub fn from_parameters(params: &ParameterSet) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let dt = params.parse_or("time_step", defaults.dt)?;
        if dt == 0.0 || !dt.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "time_step".into(),
                value: dt.to_string(),
                reason: "time step must be finite and non-zero".into(),
            });
        }
        let scheme = params
            .select("scheme", "euler, rk4", |s| s.parse().ok())?
            .unwrap_or(defaults.scheme);

        let epsilon = params.parse::<f64>("epsilon")?;
        let draw = params
            .select("dispersion_draw", "shared, independent", |s| s.parse().ok())?
            .unwrap_or(DispersionDraw::Shared);
        let horizontal_dispersion = params
            .flag("horizontal_dispersion")?
            .unwrap_or(epsilon.is_some())
            .then(|| HorizontalDispersion::new(epsilon.unwrap_or(DEFAULT_EPSILON)).with_draw(draw));

        let mut cfl = defaults.cfl;
        if let Some(threshold) = params.parse::<f64>("cfl_threshold")? {
            cfl = cfl.with_max_displacement(threshold);
        }

        Ok(Self {
            dt,
            scheme,
            horizontal_advection: params
                .flag("horizontal_advection")?
                .unwrap_or(defaults.horizontal_advection),
            vertical_advection: params
                .flag("vertical_advection")?
                .unwrap_or(defaults.vertical_advection),
            horizontal_dispersion,
            vertical_dispersion: params
                .flag("vertical_dispersion")?
                .unwrap_or(defaults.vertical_dispersion),
            seed: params.parse("seed")?,
            cfl,
            coastline: params
                .select("coastline_behavior", "none, beaching, standstill", |s| s.parse().ok())?
                .unwrap_or(defaults.coastline),
        })
    }
}
