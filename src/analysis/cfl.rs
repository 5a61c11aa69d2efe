//! CFL monitoring for particle advection.
//!
//! A particle moving more than about one cell per time step samples the
//! velocity field too coarsely to follow it. The thresholds below flag
//! such steps; they never stop a particle by themselves.
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::analysis::{CflMonitor, CflThresholds};
//! use ichthyop_rs::types::Displacement;
//!
//! let mut monitor = CflMonitor::new(CflThresholds::default());
//! let moves = [(0, Displacement::new(0.2, 0.1, 0.0)), (1, Displacement::new(1.8, 0.0, 0.0))];
//! let status = monitor.record(1, moves);
//! assert_eq!(status.warnings.len(), 1);
//! assert!(!monitor.should_stop());
//! ```

use std::fmt;

use log::warn;

use crate::types::Displacement;

/// Displacement thresholds in grid units per time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CflThresholds {
    /// Largest horizontal displacement component.
    pub max_horizontal: f64,
    /// Largest vertical displacement.
    pub max_vertical: f64,
    /// Consecutive flagged steps before recommending a smaller time step.
    pub max_consecutive_warnings: usize,
}

impl Default for CflThresholds {
    fn default() -> Self {
        Self {
            max_horizontal: 1.0,
            max_vertical: 1.0,
            max_consecutive_warnings: 10,
        }
    }
}

impl CflThresholds {
    /// Half a cell per step, three flagged steps.
    pub fn strict() -> Self {
        Self {
            max_horizontal: 0.5,
            max_vertical: 0.5,
            max_consecutive_warnings: 3,
        }
    }

    /// Only catches runaway particles.
    pub fn relaxed() -> Self {
        Self {
            max_horizontal: 5.0,
            max_vertical: 5.0,
            max_consecutive_warnings: 100,
        }
    }

    pub fn with_max_horizontal(mut self, value: f64) -> Self {
        self.max_horizontal = value;
        self
    }

    pub fn with_max_vertical(mut self, value: f64) -> Self {
        self.max_vertical = value;
        self
    }

    /// Same limit horizontally and vertically.
    pub fn with_max_displacement(self, value: f64) -> Self {
        self.with_max_horizontal(value).with_max_vertical(value)
    }

    /// Check one displacement.
    pub fn check(&self, particle: usize, d: Displacement) -> Option<CflWarning> {
        if !(d.dx.is_finite() && d.dy.is_finite() && d.dz.is_finite()) {
            return Some(CflWarning::NonFiniteDisplacement { particle });
        }
        let horizontal = d.dx.abs().max(d.dy.abs());
        if horizontal > self.max_horizontal {
            return Some(CflWarning::HorizontalExceedsMax {
                particle,
                value: horizontal,
                threshold: self.max_horizontal,
            });
        }
        if d.dz.abs() > self.max_vertical {
            return Some(CflWarning::VerticalExceedsMax {
                particle,
                value: d.dz.abs(),
                threshold: self.max_vertical,
            });
        }
        None
    }
}

/// Types of CFL warnings.
#[derive(Debug, Clone, PartialEq)]
pub enum CflWarning {
    /// Horizontal displacement above threshold.
    HorizontalExceedsMax {
        particle: usize,
        value: f64,
        threshold: f64,
    },
    /// Vertical displacement above threshold.
    VerticalExceedsMax {
        particle: usize,
        value: f64,
        threshold: f64,
    },
    /// NaN or infinite displacement.
    NonFiniteDisplacement { particle: usize },
}

impl fmt::Display for CflWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HorizontalExceedsMax {
                particle,
                value,
                threshold,
            } => write!(
                f,
                "Horizontal displacement {:.3} > {:.3} cells for particle {}",
                value, threshold, particle
            ),
            Self::VerticalExceedsMax {
                particle,
                value,
                threshold,
            } => write!(
                f,
                "Vertical displacement {:.3} > {:.3} cells for particle {}",
                value, threshold, particle
            ),
            Self::NonFiniteDisplacement { particle } => {
                write!(f, "Non-finite displacement for particle {}", particle)
            }
        }
    }
}

/// Displacement statistics of one step.
#[derive(Debug, Clone, Default)]
pub struct CflStatus {
    pub step: usize,
    /// Number of displacements checked.
    pub checked: usize,
    /// Largest horizontal component (grid units).
    pub max_horizontal: f64,
    /// Largest vertical component (grid units).
    pub max_vertical: f64,
    pub warnings: Vec<CflWarning>,
}

impl CflStatus {
    pub fn is_stable(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn has_critical_warnings(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, CflWarning::NonFiniteDisplacement { .. }))
    }
}

/// Accumulates CFL checks across steps.
#[derive(Debug, Clone)]
pub struct CflMonitor {
    thresholds: CflThresholds,
    consecutive_warnings: usize,
    total_checks: usize,
    total_warnings: usize,
    last_status: Option<CflStatus>,
}

impl Default for CflMonitor {
    fn default() -> Self {
        Self::new(CflThresholds::default())
    }
}

impl CflMonitor {
    pub fn new(thresholds: CflThresholds) -> Self {
        Self {
            thresholds,
            consecutive_warnings: 0,
            total_checks: 0,
            total_warnings: 0,
            last_status: None,
        }
    }

    pub fn thresholds(&self) -> &CflThresholds {
        &self.thresholds
    }

    /// Number of consecutive steps with at least one warning.
    pub fn consecutive_warnings(&self) -> usize {
        self.consecutive_warnings
    }

    /// Number of displacements checked so far.
    pub fn total_checks(&self) -> usize {
        self.total_checks
    }

    pub fn total_warnings(&self) -> usize {
        self.total_warnings
    }

    pub fn last_status(&self) -> Option<&CflStatus> {
        self.last_status.as_ref()
    }

    /// Check the displacements of one step.
    pub fn record(
        &mut self,
        step: usize,
        displacements: impl IntoIterator<Item = (usize, Displacement)>,
    ) -> &CflStatus {
        let mut status = CflStatus {
            step,
            ..CflStatus::default()
        };
        for (particle, d) in displacements {
            status.checked += 1;
            if d.dx.is_finite() && d.dy.is_finite() && d.dz.is_finite() {
                status.max_horizontal = status.max_horizontal.max(d.dx.abs().max(d.dy.abs()));
                status.max_vertical = status.max_vertical.max(d.dz.abs());
            }
            if let Some(warning) = self.thresholds.check(particle, d) {
                status.warnings.push(warning);
            }
        }

        self.total_checks += status.checked;
        if status.is_stable() {
            self.consecutive_warnings = 0;
        } else {
            self.consecutive_warnings += 1;
            self.total_warnings += status.warnings.len();
        }
        self.last_status.insert(status)
    }

    /// True after too many flagged steps in a row, or a non-finite
    /// displacement in the last one.
    pub fn should_stop(&self) -> bool {
        if self.consecutive_warnings >= self.thresholds.max_consecutive_warnings {
            return true;
        }
        self.last_status
            .as_ref()
            .is_some_and(CflStatus::has_critical_warnings)
    }

    /// Log the last step if it was flagged.
    pub fn report(&self, time: f64) {
        let Some(status) = &self.last_status else {
            return;
        };
        if status.is_stable() {
            return;
        }
        warn!(
            "CFL: {} of {} particles flagged at t={:.2}h, step {} (max {:.2} cells horizontal, {:.2} vertical)",
            status.warnings.len(),
            status.checked,
            time / 3600.0,
            status.step,
            status.max_horizontal,
            status.max_vertical
        );
        if self.should_stop() {
            warn!(
                "CFL: {} consecutive flagged steps, reduce the time step",
                self.consecutive_warnings
            );
        }
    }
}
