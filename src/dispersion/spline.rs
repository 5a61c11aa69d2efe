//! Piecewise cubic reconstruction of a diffusivity profile.
//!
//! The profile is known on the w levels of a column. Curvatures come from
//! the second differences of the samples, set to zero on the end nodes
//! (natural boundary). On segment `k` the profile is the cubic
//!
//! ```text
//! K(s) = d + c s + b s² + a s³,   s = (depth - depth[k]) / (depth[k+1] - depth[k])
//! ```
//!
//! which passes through `K[k]` at `s = 0` and `K[k+1]` at `s = 1`.

/// Cubic coefficients of one spline segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplineSegment {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl SplineSegment {
    /// Value at segment coordinate `s`.
    #[inline]
    pub fn value(&self, s: f64) -> f64 {
        self.d + s * (self.c + s * (self.b + s * self.a))
    }

    /// Derivative with respect to `s`.
    #[inline]
    pub fn slope(&self, s: f64) -> f64 {
        self.c + s * (2.0 * self.b + 3.0 * self.a * s)
    }
}

/// Diffusivity profile of one column.
#[derive(Clone, Debug)]
pub struct KvSpline {
    /// Node depths (negative down), bottom first, strictly increasing.
    depths: Vec<f64>,
    values: Vec<f64>,
    /// Second differences, zero on the end nodes.
    curvature: Vec<f64>,
}

impl KvSpline {
    /// Spline through `values` sampled at `depths`.
    ///
    /// Returns `None` with fewer than two nodes, mismatched lengths, a
    /// non-finite sample or depths that do not increase.
    pub fn new(depths: Vec<f64>, values: Vec<f64>) -> Option<Self> {
        let n = depths.len();
        if n < 2 || values.len() != n {
            return None;
        }
        if depths.windows(2).any(|w| !(w[1] > w[0])) || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let curvature = (0..n)
            .map(|k| {
                if k == 0 || k == n - 1 {
                    0.0
                } else {
                    values[k + 1] - 2.0 * values[k] + values[k - 1]
                }
            })
            .collect();
        Some(Self {
            depths,
            values,
            curvature,
        })
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Depth range covered by the nodes.
    pub fn range(&self) -> (f64, f64) {
        (self.depths[0], self.depths[self.depths.len() - 1])
    }

    /// Index of the segment bracketing `depth`, clamped to the first and
    /// last segments.
    pub fn segment_index(&self, depth: f64) -> usize {
        let n = self.depths.len();
        self.depths
            .partition_point(|&d| d <= depth)
            .saturating_sub(1)
            .min(n - 2)
    }

    /// Coefficients of segment `k`.
    pub fn segment(&self, k: usize) -> SplineSegment {
        let (m0, m1) = (self.curvature[k], self.curvature[k + 1]);
        let (k0, k1) = (self.values[k], self.values[k + 1]);
        SplineSegment {
            a: (m1 - m0) / 6.0,
            b: m0 / 2.0,
            c: (k1 - k0) - (m1 + 2.0 * m0) / 6.0,
            d: k0,
        }
    }

    /// Segment index and coordinate of a depth, clamped to the column.
    fn locate(&self, depth: f64) -> (usize, f64, f64) {
        let (bottom, top) = self.range();
        let depth = depth.clamp(bottom, top);
        let k = self.segment_index(depth);
        let h = self.depths[k + 1] - self.depths[k];
        (k, (depth - self.depths[k]) / h, h)
    }

    /// Diffusivity at a depth, floored at zero.
    pub fn value(&self, depth: f64) -> f64 {
        let (k, s, _) = self.locate(depth);
        self.segment(k).value(s).max(0.0)
    }

    /// Vertical derivative of the diffusivity (per meter, positive up).
    pub fn derivative(&self, depth: f64) -> f64 {
        let (k, s, h) = self.locate(depth);
        self.segment(k).slope(s) / h
    }

    /// Derivative at `depth` and diffusivity at the half-step position
    /// `depth + 0.5 * K'(depth) * dt`.
    ///
    /// The second evaluation uses the coefficients of whichever segment the
    /// predicted depth falls in.
    pub fn drift_and_predicted(&self, depth: f64, dt: f64) -> (f64, f64) {
        let slope = self.derivative(depth);
        let predicted = depth + 0.5 * slope * dt;
        (slope, self.value(predicted))
    }
}
