//! Interpolation stencils on the staggered grid.
//!
//! Along each axis a stencil holds one or two nodes. Whole-cell axes
//! (tracer placement) start at `floor(c)` with weights `|1 - n - d|`;
//! half-cell axes (face placement) start at `round(c)` with weights
//! `|0.5 - n - d|`, `d` being the offset of the position from the start.
//! Near the coast the horizontal axes shrink to a single node at the
//! rounded position.

use super::Placement;
use crate::types::GridPoint;

/// Vertical positions are kept just below the top tracer level so that the
/// upper node of a two-level stencil stays inside the array.
pub(crate) const TOP_LEVEL_EPSILON: f64 = 1.0e-5;

/// Node of a stencil: array indices and weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StencilNode {
    pub k: isize,
    pub j: isize,
    pub i: isize,
    pub weight: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Axis {
    start: isize,
    frac: f64,
    count: usize,
    /// Offset of the face nodes from cell centres (0.5), or 0.
    half: f64,
    /// Array index of node `n` is `start + n + shift`.
    shift: isize,
}

impl Axis {
    fn whole(c: f64, narrow: bool) -> Self {
        let start = if narrow { c.round() } else { c.floor() };
        Self {
            start: start as isize,
            frac: c - start,
            count: if narrow { 1 } else { 2 },
            half: 0.0,
            shift: 0,
        }
    }

    /// Both faces around `c`; staggered axes are never narrowed.
    fn half(c: f64, shift: isize) -> Self {
        let start = c.round();
        Self {
            start: start as isize,
            frac: c - start,
            count: 2,
            half: 0.5,
            shift,
        }
    }

    fn single() -> Self {
        Self {
            start: 0,
            frac: 0.0,
            count: 1,
            half: 0.0,
            shift: 0,
        }
    }

    #[inline]
    fn weight(&self, n: usize) -> f64 {
        1.0 - self.half - n as f64 - self.frac
    }

    #[inline]
    fn index(&self, n: usize) -> isize {
        self.start + n as isize + self.shift
    }
}

/// Interpolation stencil around a grid position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stencil {
    x: Axis,
    y: Axis,
    z: Axis,
}

impl Stencil {
    /// Stencil for a field with the given placement.
    ///
    /// `levels` is the number of tracer levels of the field (1 for 2-D
    /// fields, which get a single vertical node). `narrow` selects the
    /// single node on the horizontal axes that carry no face offset, used
    /// near the coast.
    pub fn new(placement: Placement, p: GridPoint, levels: usize, narrow: bool) -> Self {
        let z = if levels > 1 {
            let kz = p.z.min(levels as f64 - 1.0 - TOP_LEVEL_EPSILON).max(0.0);
            match placement {
                Placement::TopFace => Axis::half(kz, 0),
                _ => Axis::whole(kz, false),
            }
        } else {
            Axis::single()
        };
        let (x, y) = match placement {
            Placement::EastFace => (Axis::half(p.x, -1), Axis::whole(p.y, narrow)),
            Placement::NorthFace => (Axis::whole(p.x, narrow), Axis::half(p.y, -1)),
            Placement::Center | Placement::TopFace => {
                (Axis::whole(p.x, narrow), Axis::whole(p.y, narrow))
            }
        };
        Self { x, y, z }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.x.count * self.y.count * self.z.count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nodes with their weights, `k` outermost.
    pub fn nodes(&self) -> impl Iterator<Item = StencilNode> + '_ {
        (0..self.z.count).flat_map(move |kk| {
            (0..self.y.count).flat_map(move |jj| {
                (0..self.x.count).map(move |ii| StencilNode {
                    k: self.z.index(kk),
                    j: self.y.index(jj),
                    i: self.x.index(ii),
                    weight: (self.x.weight(ii) * self.y.weight(jj) * self.z.weight(kk)).abs(),
                })
            })
        })
    }

    /// Sum of the weights of all nodes.
    pub fn total_weight(&self) -> f64 {
        self.nodes().map(|n| n.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_full_stencils_are_convex() {
        let p = GridPoint::new(4.3, 2.8, 1.6);
        for placement in [
            Placement::Center,
            Placement::EastFace,
            Placement::NorthFace,
            Placement::TopFace,
        ] {
            let s = Stencil::new(placement, p, 5, false);
            assert_eq!(s.len(), 8);
            assert_relative_eq!(s.total_weight(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_east_face_indices() {
        // x = 4.3 rounds to 4: faces at 3.5 (u index 3) and 4.5 (u index 4).
        let s = Stencil::new(Placement::EastFace, GridPoint::new(4.3, 2.0, 0.0), 1, false);
        let nodes: Vec<_> = s.nodes().filter(|n| n.weight > 0.0).collect();
        assert_eq!(nodes.len(), 2);
        assert_eq!((nodes[0].i, nodes[1].i), (3, 4));
        assert_relative_eq!(nodes[0].weight, 0.2, epsilon = 1e-12);
        assert_relative_eq!(nodes[1].weight, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_top_face_indices() {
        // z = 2.3 rounds to 2: w levels 2 (z = 1.5) and 3 (z = 2.5).
        let s = Stencil::new(Placement::TopFace, GridPoint::new(1.0, 1.0, 2.3), 4, false);
        let ks: Vec<_> = s.nodes().filter(|n| n.weight > 0.0).map(|n| (n.k, n.weight)).collect();
        assert_eq!(ks.len(), 2);
        assert_eq!(ks[0].0, 2);
        assert_relative_eq!(ks[0].1, 0.2, epsilon = 1e-12);
        assert_eq!(ks[1].0, 3);
        assert_relative_eq!(ks[1].1, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_narrow_stencil_uses_nearest_column() {
        let s = Stencil::new(Placement::Center, GridPoint::new(4.7, 2.2, 1.5), 3, true);
        assert_eq!(s.len(), 2);
        assert!(s.nodes().all(|n| n.i == 5 && n.j == 2));
    }

    #[test]
    fn test_narrow_face_stencil_keeps_both_faces() {
        // x = 4.45 sits 0.05 cells west of the u face at 4.5 (u index 4).
        let s = Stencil::new(Placement::EastFace, GridPoint::new(4.45, 2.6, 0.0), 1, true);
        let nodes: Vec<_> = s.nodes().collect();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.j == 3));
        assert_eq!((nodes[0].i, nodes[1].i), (3, 4));
        assert!(nodes[1].weight > nodes[0].weight);

        let s = Stencil::new(Placement::NorthFace, GridPoint::new(2.2, 3.7, 0.0), 1, true);
        let nodes: Vec<_> = s.nodes().collect();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.i == 2));
        assert_eq!((nodes[0].j, nodes[1].j), (3, 4));
    }

    #[test]
    fn test_surface_position_stays_in_array() {
        let s = Stencil::new(Placement::Center, GridPoint::new(1.0, 1.0, 4.0), 5, false);
        assert!(s.nodes().all(|n| n.k <= 4));
        let upper: f64 = s.nodes().filter(|n| n.k == 4).map(|n| n.weight).sum();
        assert!(upper > 0.999);
    }
}
