//! Space-time interpolation of staggered fields.
//!
//! A field is known at two time records bracketing the clock. Values at a
//! particle are obtained by weighting the stencil nodes around its grid
//! position (see [`Stencil`]) and blending the two records linearly in
//! time (see [`TimeBlend`]).
//!
//! # Placement
//!
//! | Placement   | Field          | Node position       |
//! |-------------|----------------|---------------------|
//! | `Center`    | tracers        | `(i, j, k)`         |
//! | `EastFace`  | u              | `(i + 0.5, j, k)`   |
//! | `NorthFace` | v              | `(i, j + 0.5, k)`   |
//! | `TopFace`   | w              | `(i, j, k - 0.5)`   |
//!
//! # Land
//!
//! Near the coast the horizontal stencil shrinks to the nearest column.
//! Tracer nodes on land (or holding fill values) are left out of the
//! weight sum; velocity nodes holding NaN count as still water. A stencil
//! left with no weight at all is resolved by [`EmptyStencilPolicy`].
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::interpolation::{FieldInterpolator, FieldPair, Placement, TimeBlend};
//! use ichthyop_rs::dataset::synthetic::FlatCurrent;
//! use ichthyop_rs::types::GridPoint;
//!
//! let scenario = FlatCurrent::new(10, 10, 5).with_u(1.0);
//! let geometry = scenario.geometry().unwrap();
//! let u = scenario.u_field();
//! let pair = FieldPair::new("u", &u, &u);
//! let interpolator = FieldInterpolator::new(&geometry);
//!
//! let p = GridPoint::new(4.5, 4.5, 2.0);
//! let dxdt = interpolator
//!     .grid_velocity(&pair, Placement::EastFace, p, TimeBlend::at_start())
//!     .unwrap();
//! assert!((dxdt - 1.0 / scenario.dx()).abs() < 1e-12);
//! ```

mod stencil;

pub use stencil::{Stencil, StencilNode};

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::grid::{Array3, GridGeometry};
use crate::types::GridPoint;

// =============================================================================
// Errors and policies
// =============================================================================

/// Per-particle interpolation failure.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InterpolationError {
    /// A stencil node lies outside the loaded field
    #[error("'{field}' sampled outside the domain at k={k}, j={j}, i={i}")]
    OutOfDomain {
        field: String,
        k: isize,
        j: isize,
        i: isize,
    },

    /// Every stencil node is on land
    #[error("'{field}' has no water node around the particle")]
    EmptyStencil { field: String },
}

/// Result of a stencil whose weights sum to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmptyStencilPolicy {
    /// Return the (zero) accumulator.
    #[default]
    Zero,
    /// Return NaN.
    Nan,
    /// Report [`InterpolationError::EmptyStencil`].
    DomainExit,
}

impl FromStr for EmptyStencilPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(Self::Zero),
            "nan" => Ok(Self::Nan),
            "domain_exit" | "exit" => Ok(Self::DomainExit),
            other => Err(format!("unknown empty stencil policy '{}'", other)),
        }
    }
}

/// Interpolation of tracer fields.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ScalarMethod {
    /// Weighted 2x2x2 stencil.
    #[default]
    Trilinear,
    /// Value of the nearest node.
    ClosestNode,
    /// Inverse-distance weighting over the nodes of the enclosing cell.
    InverseDistance { power: f64, radius: f64 },
}

impl ScalarMethod {
    /// Inverse-distance weighting with power 2 within one grid unit.
    pub fn inverse_distance() -> Self {
        Self::InverseDistance {
            power: 2.0,
            radius: 1.0,
        }
    }
}

impl FromStr for ScalarMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trilinear" | "linear" => Ok(Self::Trilinear),
            "closest" | "closest_node" | "nearest" => Ok(Self::ClosestNode),
            "idw" | "inverse_distance" => Ok(Self::inverse_distance()),
            other => Err(format!("unknown interpolation method '{}'", other)),
        }
    }
}

/// Staggered placement of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    Center,
    EastFace,
    NorthFace,
    TopFace,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Center => write!(f, "center"),
            Self::EastFace => write!(f, "east face"),
            Self::NorthFace => write!(f, "north face"),
            Self::TopFace => write!(f, "top face"),
        }
    }
}

// =============================================================================
// Time blending
// =============================================================================

/// Position of the clock between two records.
///
/// `fraction = (Δt - |t1 - t|) / Δt`, which reads the same for a forward or
/// a backward clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeBlend {
    fraction: f64,
}

impl TimeBlend {
    /// Blend for the clock at `time`, records `dt_records` apart with the
    /// upcoming one at `t1`.
    pub fn new(time: f64, t1: f64, dt_records: f64) -> Self {
        let dt = dt_records.abs();
        let fraction = if dt > 0.0 {
            (dt - (t1 - time).abs()) / dt
        } else {
            0.0
        };
        Self { fraction }
    }

    /// Clock on the first record.
    pub fn at_start() -> Self {
        Self { fraction: 0.0 }
    }

    /// Clock on the second record.
    pub fn at_end() -> Self {
        Self { fraction: 1.0 }
    }

    #[inline]
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    #[inline]
    pub fn blend(&self, v0: f64, v1: f64) -> f64 {
        if self.fraction == 0.0 {
            v0
        } else {
            (1.0 - self.fraction) * v0 + self.fraction * v1
        }
    }
}

/// Two time records of one field.
#[derive(Clone, Copy, Debug)]
pub struct FieldPair<'a> {
    pub name: &'a str,
    pub t0: &'a Array3,
    pub t1: &'a Array3,
}

impl<'a> FieldPair<'a> {
    pub fn new(name: &'a str, t0: &'a Array3, t1: &'a Array3) -> Self {
        Self { name, t0, t1 }
    }

    #[inline]
    fn sample(&self, blend: TimeBlend, k: usize, j: usize, i: usize) -> f64 {
        blend.blend(self.t0.get(k, j, i), self.t1.get(k, j, i))
    }
}

// =============================================================================
// Interpolator
// =============================================================================

/// Interpolates fields on a grid.
#[derive(Clone, Copy, Debug)]
pub struct FieldInterpolator<'g> {
    geometry: &'g GridGeometry,
    policy: EmptyStencilPolicy,
    method: ScalarMethod,
}

impl<'g> FieldInterpolator<'g> {
    pub fn new(geometry: &'g GridGeometry) -> Self {
        Self {
            geometry,
            policy: EmptyStencilPolicy::default(),
            method: ScalarMethod::default(),
        }
    }

    pub fn with_policy(mut self, policy: EmptyStencilPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_method(mut self, method: ScalarMethod) -> Self {
        self.method = method;
        self
    }

    pub fn geometry(&self) -> &'g GridGeometry {
        self.geometry
    }

    /// Tracer levels of a field (w fields have one more w level).
    fn levels(&self, field: &FieldPair<'_>, placement: Placement) -> usize {
        match placement {
            Placement::TopFace => field.t0.nz().saturating_sub(1),
            _ => field.t0.nz(),
        }
    }

    /// Stencil used for a field at a position.
    pub fn stencil(&self, field: &FieldPair<'_>, placement: Placement, p: GridPoint) -> Stencil {
        let narrow = self.geometry.is_close_to_coast(p);
        Stencil::new(placement, p, self.levels(field, placement), narrow)
    }

    /// Physical value of a field at a position.
    pub fn interpolate(
        &self,
        field: &FieldPair<'_>,
        placement: Placement,
        p: GridPoint,
        blend: TimeBlend,
    ) -> Result<f64, InterpolationError> {
        self.weighted(field, placement, p, blend, |_, _, _| 1.0)
    }

    /// Velocity in grid units per second along the axis of the placement.
    ///
    /// U samples are divided by `dx` at their u point, v samples by `dy` at
    /// their v point, w samples by half the distance between the faces
    /// around their w level.
    pub fn grid_velocity(
        &self,
        field: &FieldPair<'_>,
        placement: Placement,
        p: GridPoint,
        blend: TimeBlend,
    ) -> Result<f64, InterpolationError> {
        let g = self.geometry;
        let m = g.metrics();
        match placement {
            Placement::EastFace => {
                self.weighted(field, placement, p, blend, |_, j, i| 1.0 / m.dx_u(j, i))
            }
            Placement::NorthFace => {
                self.weighted(field, placement, p, blend, |_, j, i| 1.0 / m.dy_v(j, i))
            }
            Placement::TopFace => self.weighted(field, placement, p, blend, |k, j, i| {
                2.0 / g.w_level_span(k, j, i)
            }),
            Placement::Center => self.weighted(field, placement, p, blend, |_, _, _| 1.0),
        }
    }

    /// Tracer value with the configured scalar method.
    pub fn scalar(
        &self,
        field: &FieldPair<'_>,
        p: GridPoint,
        blend: TimeBlend,
    ) -> Result<f64, InterpolationError> {
        match self.method {
            ScalarMethod::Trilinear => self.interpolate(field, Placement::Center, p, blend),
            ScalarMethod::ClosestNode => self.closest_node(field, p, blend),
            ScalarMethod::InverseDistance { power, radius } => {
                self.inverse_distance(field, p, blend, power, radius)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Stencil evaluation
    // -------------------------------------------------------------------------

    /// Array indices of a stencil node, periodic `i` wrapped.
    fn node_index(
        &self,
        field: &FieldPair<'_>,
        k: isize,
        j: isize,
        i: isize,
    ) -> Result<(usize, usize, usize), InterpolationError> {
        let a = field.t0;
        let i = self.geometry.horizontal().wrap_i(i);
        let inside = k >= 0
            && j >= 0
            && i >= 0
            && (k as usize) < a.nz()
            && (j as usize) < a.ny()
            && (i as usize) < a.nx();
        if inside {
            Ok((k as usize, j as usize, i as usize))
        } else {
            Err(InterpolationError::OutOfDomain {
                field: field.name.to_string(),
                k,
                j,
                i,
            })
        }
    }

    fn weighted(
        &self,
        field: &FieldPair<'_>,
        placement: Placement,
        p: GridPoint,
        blend: TimeBlend,
        scale: impl Fn(usize, usize, usize) -> f64,
    ) -> Result<f64, InterpolationError> {
        let stencil = self.stencil(field, placement, p);
        let tracer = placement == Placement::Center;
        let flat = field.t0.nz() == 1;

        let mut value = 0.0;
        let mut co = 0.0;
        for node in stencil.nodes() {
            if node.weight == 0.0 {
                continue;
            }
            let (k, j, i) = self.node_index(field, node.k, node.j, node.i)?;
            let sample = field.sample(blend, k, j, i);
            if tracer {
                let level = if flat { self.geometry.nz() as isize - 1 } else { k as isize };
                if !sample.is_finite() || !self.geometry.is_in_water(level, j as isize, i as isize) {
                    continue;
                }
            }
            co += node.weight;
            if sample.is_finite() {
                value += node.weight * sample * scale(k, j, i);
            }
        }
        self.normalize(field, value, co)
    }

    fn normalize(&self, field: &FieldPair<'_>, value: f64, co: f64) -> Result<f64, InterpolationError> {
        if co != 0.0 {
            return Ok(value / co);
        }
        match self.policy {
            EmptyStencilPolicy::Zero => Ok(value),
            EmptyStencilPolicy::Nan => Ok(f64::NAN),
            EmptyStencilPolicy::DomainExit => Err(InterpolationError::EmptyStencil {
                field: field.name.to_string(),
            }),
        }
    }

    fn closest_node(
        &self,
        field: &FieldPair<'_>,
        p: GridPoint,
        blend: TimeBlend,
    ) -> Result<f64, InterpolationError> {
        let levels = field.t0.nz();
        let k = if levels > 1 {
            p.z.max(0.0).min((levels - 1) as f64).round() as isize
        } else {
            0
        };
        let (k, j, i) = self.node_index(field, k, p.y.round() as isize, p.x.round() as isize)?;
        let sample = field.sample(blend, k, j, i);
        let level = if levels == 1 { self.geometry.nz() as isize - 1 } else { k as isize };
        if sample.is_finite() && self.geometry.is_in_water(level, j as isize, i as isize) {
            Ok(sample)
        } else {
            self.normalize(field, 0.0, 0.0)
        }
    }

    fn inverse_distance(
        &self,
        field: &FieldPair<'_>,
        p: GridPoint,
        blend: TimeBlend,
        power: f64,
        radius: f64,
    ) -> Result<f64, InterpolationError> {
        let stencil = Stencil::new(Placement::Center, p, field.t0.nz(), false);
        let flat = field.t0.nz() == 1;
        let mut value = 0.0;
        let mut co = 0.0;
        for node in stencil.nodes() {
            if node.weight == 0.0 {
                continue;
            }
            let (k, j, i) = self.node_index(field, node.k, node.j, node.i)?;
            let sample = field.sample(blend, k, j, i);
            let level = if flat { self.geometry.nz() as isize - 1 } else { k as isize };
            if !sample.is_finite() || !self.geometry.is_in_water(level, j as isize, i as isize) {
                continue;
            }
            let dz = if flat { 0.0 } else { p.z - k as f64 };
            let d = ((p.x - node.i as f64).powi(2) + (p.y - node.j as f64).powi(2) + dz.powi(2)).sqrt();
            if d < 1.0e-9 {
                return Ok(sample);
            }
            if d > radius {
                continue;
            }
            let w = d.powf(-power);
            value += w * sample;
            co += w;
        }
        self.normalize(field, value, co)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{HorizontalGrid, HorizontalMetrics, LandMask};
    use crate::vertical::{VerticalGrid, ZLevels};
    use approx::assert_relative_eq;

    /// 8x6 grid, 4 levels of 10 m, 1 km spacing, land in column 0 and at
    /// the bottom cell (0, 3, 4).
    fn geometry() -> GridGeometry {
        let lon = (0..8).map(|i| 5.0 + 0.01 * i as f64).collect();
        let lat = (0..6).map(|j| 43.0 + 0.01 * j as f64).collect();
        let horizontal = HorizontalGrid::rectilinear(lon, lat, false).unwrap();
        let metrics = HorizontalMetrics::uniform(6, 8, 1000.0, 1000.0);
        let vertical = VerticalGrid::ZLevels(ZLevels::uniform(4, 40.0).unwrap());
        let mut mask = LandMask::all_wet(4, 6, 8);
        for j in 0..6 {
            mask.set_column_dry(j, 0);
        }
        mask.set_dry(0, 3, 4);
        GridGeometry::new(horizontal, metrics, vertical, mask).unwrap()
    }

    #[test]
    fn test_time_blend_endpoints() {
        assert_eq!(TimeBlend::new(0.0, 3600.0, 3600.0).fraction(), 0.0);
        assert_eq!(TimeBlend::new(3600.0, 3600.0, 3600.0).fraction(), 1.0);
        assert_relative_eq!(TimeBlend::new(1800.0, 3600.0, 3600.0).fraction(), 0.5);
        // Backward clock: t1 lies before t0.
        assert_eq!(TimeBlend::new(3600.0, 0.0, -3600.0).fraction(), 0.0);
        assert_relative_eq!(TimeBlend::new(900.0, 0.0, -3600.0).fraction(), 0.75);
        assert_eq!(TimeBlend::new(10.0, 10.0, 0.0).fraction(), 0.0);

        let blend = TimeBlend::new(900.0, 3600.0, 3600.0);
        assert_relative_eq!(blend.blend(2.0, 6.0), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_uniform_scalar_is_exact() {
        let g = geometry();
        let temp = Array3::from_fn(4, 6, 8, |_, _, i| if i == 0 { f64::NAN } else { 12.5 });
        let pair = FieldPair::new("temp", &temp, &temp);
        let interp = FieldInterpolator::new(&g);
        let value = interp
            .scalar(&pair, GridPoint::new(4.3, 2.6, 1.4), TimeBlend::at_start())
            .unwrap();
        assert_relative_eq!(value, 12.5, epsilon = 1e-12);
    }

    #[test]
    fn test_east_face_field_is_linear() {
        let g = geometry();
        // u at x = iu + 0.5 holds x - 0.5
        let u = Array3::from_fn(4, 6, 7, |_, _, iu| iu as f64);
        let pair = FieldPair::new("u", &u, &u);
        let interp = FieldInterpolator::new(&g);
        let p = GridPoint::new(4.3, 2.6, 1.4);
        let value = interp
            .interpolate(&pair, Placement::EastFace, p, TimeBlend::at_start())
            .unwrap();
        assert_relative_eq!(value, 3.8, epsilon = 1e-12);
        let dxdt = interp
            .grid_velocity(&pair, Placement::EastFace, p, TimeBlend::at_start())
            .unwrap();
        assert_relative_eq!(dxdt, 3.8e-3, epsilon = 1e-12);
    }

    #[test]
    fn test_east_face_near_coast_uses_nearest_face() {
        let g = geometry();
        // Only the u face at x = 3.5 (u index 3) carries a current.
        let u = Array3::from_fn(4, 6, 7, |_, _, iu| if iu == 3 { 1.0 } else { 0.0 });
        let pair = FieldPair::new("u", &u, &u);
        let interp = FieldInterpolator::new(&g);
        let p = GridPoint::new(3.45, 2.6, 0.0);
        assert!(g.is_close_to_coast(p));
        let value = interp
            .interpolate(&pair, Placement::EastFace, p, TimeBlend::at_start())
            .unwrap();
        assert_relative_eq!(value, 0.95, epsilon = 1e-12);
    }

    #[test]
    fn test_time_blend_applies_to_samples() {
        let g = geometry();
        let v0 = Array3::filled(4, 5, 8, 0.2);
        let v1 = Array3::filled(4, 5, 8, 0.6);
        let pair = FieldPair::new("v", &v0, &v1);
        let interp = FieldInterpolator::new(&g);
        let value = interp
            .interpolate(
                &pair,
                Placement::NorthFace,
                GridPoint::new(3.2, 2.5, 2.0),
                TimeBlend::new(1800.0, 3600.0, 3600.0),
            )
            .unwrap();
        assert_relative_eq!(value, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_velocity_scaling() {
        let g = geometry();
        let w = Array3::filled(5, 6, 8, 0.01);
        let pair = FieldPair::new("w", &w, &w);
        let interp = FieldInterpolator::new(&g);
        let dzdt = interp
            .grid_velocity(
                &pair,
                Placement::TopFace,
                GridPoint::new(4.0, 2.0, 2.3),
                TimeBlend::at_start(),
            )
            .unwrap();
        // Faces around interior w levels are 20 m apart.
        assert_relative_eq!(dzdt, 0.01 * 2.0 / 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nan_velocity_counts_as_still_water() {
        let g = geometry();
        let u = Array3::from_fn(4, 6, 7, |_, _, iu| if iu == 3 { f64::NAN } else { 4.0 });
        let pair = FieldPair::new("u", &u, &u);
        let value = FieldInterpolator::new(&g)
            .interpolate(
                &pair,
                Placement::EastFace,
                GridPoint::new(4.3, 2.0, 1.0),
                TimeBlend::at_start(),
            )
            .unwrap();
        assert_relative_eq!(value, 0.8 * 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_land_nodes_are_left_out() {
        let g = geometry();
        let temp = Array3::from_fn(4, 6, 8, |k, j, i| {
            if (k, j, i) == (0, 3, 4) {
                999.0
            } else {
                i as f64
            }
        });
        let pair = FieldPair::new("temp", &temp, &temp);
        let value = FieldInterpolator::new(&g)
            .scalar(&pair, GridPoint::new(4.4, 3.0, 0.0), TimeBlend::at_start())
            .unwrap();
        assert_relative_eq!(value, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_stencil_policy() {
        let g = geometry();
        let temp = Array3::filled(4, 6, 8, f64::NAN);
        let pair = FieldPair::new("temp", &temp, &temp);
        let p = GridPoint::new(4.3, 2.6, 1.4);
        let blend = TimeBlend::at_start();

        let zero = FieldInterpolator::new(&g).scalar(&pair, p, blend).unwrap();
        assert_eq!(zero, 0.0);

        let nan = FieldInterpolator::new(&g)
            .with_policy(EmptyStencilPolicy::Nan)
            .scalar(&pair, p, blend)
            .unwrap();
        assert!(nan.is_nan());

        let err = FieldInterpolator::new(&g)
            .with_policy(EmptyStencilPolicy::DomainExit)
            .scalar(&pair, p, blend)
            .unwrap_err();
        assert_eq!(
            err,
            InterpolationError::EmptyStencil {
                field: "temp".into()
            }
        );
    }

    #[test]
    fn test_out_of_domain() {
        let g = geometry();
        let temp = Array3::filled(4, 6, 8, 1.0);
        let pair = FieldPair::new("temp", &temp, &temp);
        let err = FieldInterpolator::new(&g)
            .scalar(&pair, GridPoint::new(20.0, 2.0, 1.0), TimeBlend::at_start())
            .unwrap_err();
        assert!(matches!(err, InterpolationError::OutOfDomain { i: 20, .. }));
    }

    #[test]
    fn test_alternative_scalar_methods() {
        let g = geometry();
        let field = Array3::from_fn(4, 6, 8, |_, j, i| (i + 10 * j) as f64);
        let pair = FieldPair::new("salt", &field, &field);
        let blend = TimeBlend::at_start();

        let closest = FieldInterpolator::new(&g)
            .with_method(ScalarMethod::ClosestNode)
            .scalar(&pair, GridPoint::new(3.4, 2.6, 1.2), blend)
            .unwrap();
        assert_eq!(closest, 33.0);

        let idw = FieldInterpolator::new(&g).with_method(ScalarMethod::inverse_distance());
        let exact = idw.scalar(&pair, GridPoint::new(3.0, 2.0, 1.0), blend).unwrap();
        assert_eq!(exact, 23.0);
        let between = idw.scalar(&pair, GridPoint::new(3.5, 2.0, 1.0), blend).unwrap();
        assert_relative_eq!(between, 23.5, epsilon = 1e-12);
    }

    #[test]
    fn test_closest_node_skips_land() {
        let g = geometry();
        // Land stores 0 rather than a fill value.
        let temp = Array3::from_fn(4, 6, 8, |_, _, i| if i == 0 { 0.0 } else { 14.0 });
        let pair = FieldPair::new("temp", &temp, &temp);
        let closest = FieldInterpolator::new(&g)
            .with_method(ScalarMethod::ClosestNode)
            .with_policy(EmptyStencilPolicy::Nan);
        let on_land = closest
            .scalar(&pair, GridPoint::new(0.3, 2.0, 1.0), TimeBlend::at_start())
            .unwrap();
        assert!(on_land.is_nan());
        let at_sea = closest
            .scalar(&pair, GridPoint::new(1.2, 2.0, 1.0), TimeBlend::at_start())
            .unwrap();
        assert_eq!(at_sea, 14.0);
    }

    #[test]
    fn test_parse_options() {
        assert_eq!("nan".parse::<EmptyStencilPolicy>(), Ok(EmptyStencilPolicy::Nan));
        assert_eq!(
            "domain_exit".parse::<EmptyStencilPolicy>(),
            Ok(EmptyStencilPolicy::DomainExit)
        );
        assert_eq!("closest".parse::<ScalarMethod>(), Ok(ScalarMethod::ClosestNode));
        assert!("cubic".parse::<ScalarMethod>().is_err());
    }
}
