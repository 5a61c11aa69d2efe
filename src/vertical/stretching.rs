//! Vertical stretching curves for s-coordinate grids.
//!
//! A stretching curve `Cs(s)` maps the uniform s-coordinate
//! `s ∈ [-1, 0]` onto the stretched one. Archives normally ship the curves
//! as `Cs_r`/`Cs_w`; older files only carry `theta_s`, `theta_b` and `hc`,
//! in which case the curves are rebuilt from these parameters.
//!
//! # Available Curves
//!
//! - [`UniformStretching`]: `Cs(s) = s`
//! - [`SongHaidvogelStretching`]: ROMS surface/bottom clustering
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::vertical::{SongHaidvogelStretching, Stretching};
//!
//! let stretching = SongHaidvogelStretching::new(6.0, 0.4);
//! let (cs_r, cs_w) = stretching.curves(20);
//! assert_eq!(cs_r.len(), 20);
//! assert_eq!(cs_w.len(), 21);
//! assert!((cs_w[0] + 1.0).abs() < 1e-12);
//! ```

/// Uniform s-coordinate at rho levels, `((k - nz) + 0.5) / nz`.
pub fn sc_r(k: usize, nz: usize) -> f64 {
    ((k as f64 - nz as f64) + 0.5) / nz as f64
}

/// Uniform s-coordinate at w levels, `(k - nz) / nz`.
pub fn sc_w(k: usize, nz: usize) -> f64 {
    (k as f64 - nz as f64) / nz as f64
}

/// Trait for vertical stretching curves.
///
/// Returns `(cs_r, cs_w)`:
/// - `cs_r`: curve at rho levels, length `nz`
/// - `cs_w`: curve at w levels, length `nz + 1`, from -1 (bottom) to 0 (surface)
pub trait Stretching: Send + Sync {
    /// Stretching function at one s value.
    fn cs(&self, s: f64) -> f64;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Curves at rho and w levels.
    fn curves(&self, nz: usize) -> (Vec<f64>, Vec<f64>) {
        let cs_r = (0..nz).map(|k| self.cs(sc_r(k, nz))).collect();
        let cs_w = (0..=nz).map(|k| self.cs(sc_w(k, nz))).collect();
        (cs_r, cs_w)
    }

    /// Description of parameters (for diagnostics).
    fn description(&self) -> String {
        self.name().to_string()
    }
}

// =============================================================================
// Uniform Stretching
// =============================================================================

/// No stretching: levels follow the uniform s-coordinate.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformStretching;

impl Stretching for UniformStretching {
    fn cs(&self, s: f64) -> f64 {
        s
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}

// =============================================================================
// Song-Haidvogel Stretching (ROMS Default)
// =============================================================================

/// Song-Haidvogel (1994) stretching.
///
/// ```text
/// Cs(s) = (1 - θb) sinh(θs s) / sinh(θs)
///       + θb [tanh(θs (s + 1/2)) / (2 tanh(θs / 2)) - 1/2]
/// ```
///
/// - `theta_s`: surface refinement (0 to 10, 0 = none)
/// - `theta_b`: bottom refinement (0 to 1)
#[derive(Clone, Copy, Debug)]
pub struct SongHaidvogelStretching {
    pub theta_s: f64,
    pub theta_b: f64,
}

impl Default for SongHaidvogelStretching {
    fn default() -> Self {
        Self {
            theta_s: 5.0,
            theta_b: 0.4,
        }
    }
}

impl SongHaidvogelStretching {
    pub fn new(theta_s: f64, theta_b: f64) -> Self {
        Self { theta_s, theta_b }
    }
}

impl Stretching for SongHaidvogelStretching {
    fn cs(&self, s: f64) -> f64 {
        if self.theta_s <= 0.0 {
            return s;
        }
        let surface = (self.theta_s * s).sinh() / self.theta_s.sinh();
        let bottom = (self.theta_s * (s + 0.5)).tanh() / (2.0 * (0.5 * self.theta_s).tanh()) - 0.5;
        (1.0 - self.theta_b) * surface + self.theta_b * bottom
    }

    fn name(&self) -> &'static str {
        "song_haidvogel"
    }

    fn description(&self) -> String {
        format!(
            "Song-Haidvogel (theta_s={:.1}, theta_b={:.2})",
            self.theta_s, self.theta_b
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
