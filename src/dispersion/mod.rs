//! Stochastic turbulent dispersion.
//!
//! Sub-grid turbulence is modelled as random walks added to the advective
//! displacement:
//!
//! | Component | Model | Parameters |
//! |-----------|-------|------------|
//! | [`HorizontalDispersion`] | Richardson 4/3 law, `Kh = ε^(1/3) l^(4/3)` | dissipation rate ε, draw mode |
//! | [`VerticalDispersion`] | Random displacement with drift (Visser 1997) | diffusivity profiles |
//!
//! Both draw from any [`rand::Rng`]; seeded runs use one
//! `rand_chacha::ChaCha8Rng` stream per particle.
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::dispersion::reflect;
//!
//! // A particle on the bottom level pushed 0.4 levels down bounces back up.
//! assert!((reflect(0.0, -0.4, 5) - 0.4).abs() < 1e-12);
//! ```

mod horizontal;
mod spline;
mod vertical;

pub use horizontal::{DispersionDraw, HorizontalDispersion, DEFAULT_EPSILON};
pub use spline::{KvSpline, SplineSegment};
pub use vertical::{reflect, DiffusivityProfile, KvSample, VerticalDispersion};
