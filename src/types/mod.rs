//! Strongly-typed domain types.
//!
//! Grid-space and geographic positions are distinct types so that an
//! index computation can never be fed a longitude by mistake.
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::types::{GeoPoint, GridPoint, TimeArrow};
//!
//! let p = GridPoint::new(12.3, 40.7, 24.5);
//! let release = GeoPoint::new(-4.2, 47.1, -10.0);
//! assert!(TimeArrow::Forward.before(0.0, 3600.0));
//! assert!(p.is_finite());
//! assert!(release.depth < 0.0);
//! ```

mod coords;
mod extent;
mod time;

pub use coords::{Displacement, GeoPoint, GridPoint};
pub use extent::GeoExtent;
pub use time::TimeArrow;
