//! # ichthyop-rs
//!
//! Lagrangian transport of ichthyoplankton through stored ocean model
//! output.
//!
//! The crate provides the numerical core of a particle-tracking model:
//! - Grid geometry for ROMS, NEMO and regular longitude/latitude grids
//! - Vertical coordinates (s-coordinates, z-levels with partial steps)
//! - Spatio-temporal interpolation of staggered fields
//! - A two-record cache over a series of archive files
//! - Advection (Euler, RK4, forward and backward in time)
//! - Horizontal and vertical random-walk dispersion
//! - A step-driven particle tracker
//!
//! Positions are tracked in fractional grid indices ([`GridPoint`]) and
//! reported in geographic coordinates ([`GeoPoint`]).

pub mod advection;
pub mod analysis;
pub mod config;
pub mod dataset;
pub mod dispersion;
pub mod grid;
pub mod interpolation;
pub mod io;
pub mod simulation;
pub mod types;
pub mod vertical;

pub use advection::{Advection, AdvectionScheme, TransportError, VelocityField};
pub use analysis::{CflMonitor, CflThresholds};
pub use config::{ConfigError, DatasetConfig, GridConvention, ParameterSet, TransportConfig, VariableNames};
pub use dataset::{Dataset, DatasetError, TimeSeriesCache};
pub use dispersion::{DispersionDraw, HorizontalDispersion, VerticalDispersion};
pub use grid::{GridError, GridGeometry, OceanModel};
pub use interpolation::{EmptyStencilPolicy, FieldInterpolator, InterpolationError, Placement, ScalarMethod};
pub use io::{Archive, ArchiveError, ArchiveSource};
pub use simulation::{CoastlineBehavior, DeathCause, Particle, ParticleTracker, StepReport};
pub use types::{Displacement, GeoPoint, GridPoint, TimeArrow};
