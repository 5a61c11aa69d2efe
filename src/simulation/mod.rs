//! Particle population driver.
//!
//! A [`ParticleTracker`] owns the [`Dataset`](crate::dataset::Dataset) of a
//! run and a population of [`Particle`]s. One call to
//! [`step`](ParticleTracker::step) advances the dataset (a barrier: no
//! particle reads the records while they move), then moves every live
//! particle and reports the deaths and CFL statistics of the step.
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::config::TransportConfig;
//! use ichthyop_rs::dataset::synthetic::FlatCurrent;
//! use ichthyop_rs::simulation::ParticleTracker;
//! use ichthyop_rs::types::GridPoint;
//!
//! let scenario = FlatCurrent::new(20, 10, 3).with_u(0.2);
//! let mut tracker = ParticleTracker::new(
//!     scenario.dataset().unwrap(),
//!     TransportConfig::new(900.0).with_seed(7),
//! )
//! .unwrap();
//! tracker.start(0.0).unwrap();
//! let id = tracker.release(GridPoint::new(6.0, 5.0, 1.0)).unwrap();
//!
//! tracker.run(4).unwrap();
//! let p = tracker.particle(id).unwrap();
//! assert!(p.is_alive());
//! assert!(p.position().x > 6.0);
//! ```

mod particle;
mod tracker;

pub use particle::{DeathCause, Particle};
pub use tracker::{CoastlineBehavior, ParticleTracker, StepReport};
