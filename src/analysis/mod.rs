//! Run diagnostics.
//!
//! Particle steps are checked against CFL-like displacement thresholds:
//! a particle moving more than about one cell per step samples the
//! currents too coarsely. Flagged steps are logged and counted, never
//! fatal.

mod cfl;

pub use cfl::{CflMonitor, CflStatus, CflThresholds, CflWarning};
