//! Direction of simulated time.

use std::fmt;

/// Direction in which the simulation clock moves.
///
/// Forward runs integrate trajectories into the future; backward runs
/// reconstruct where particles came from. All record and file comparisons
/// are written as `arrow * a < arrow * b` so one code path serves both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeArrow {
    #[default]
    Forward,
    Backward,
}

impl TimeArrow {
    /// Arrow matching the sign of a time step.
    pub fn from_dt(dt: f64) -> Self {
        if dt >= 0.0 {
            Self::Forward
        } else {
            Self::Backward
        }
    }

    /// `+1` forward, `-1` backward.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }

    /// Sign as a float.
    #[inline]
    pub fn signum(self) -> f64 {
        self.sign() as f64
    }

    #[inline]
    pub fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }

    /// True when `a` comes strictly before `b` along the arrow.
    #[inline]
    pub fn before(self, a: f64, b: f64) -> bool {
        self.signum() * a < self.signum() * b
    }
}

impl fmt::Display for TimeArrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
        }
    }
}
