//! Geopotential (z-level) vertical grid.
//!
//! Level depths depend only on `k`. Depths are stored positive downward,
//! bottom level first:
//!
//! - `depth_t[k]`: tracer point of cell `k`, `k = 0..nz`
//! - `depth_w[k]`: lower face of cell `k`, `k = 0..=nz`, with
//!   `depth_w[nz] = 0` at the surface
//!
//! The fractional level `z` is measured from the tracer point and can go
//! half a cell either way: `z = k - 0.5` is the lower face of cell `k`,
//! `z = k + 0.5` its upper face.
//!
//! Partial bottom cells are described by an optional 3-D thickness array.

use crate::grid::{Array3, GridError};

/// Z-level vertical grid.
#[derive(Clone, Debug)]
pub struct ZLevels {
    depth_t: Vec<f64>,
    depth_w: Vec<f64>,
    /// Cell thickness per column, overrides `depth_w` differences when set.
    e3t: Option<Array3>,
    /// Thickness of u and v faces, when the mesh provides them.
    e3u: Option<Array3>,
    e3v: Option<Array3>,
}

impl ZLevels {
    /// Build from tracer and face depths (positive down, bottom first).
    ///
    /// `depth_w` may hold `nz + 1` faces, or only the `nz` upper faces of the
    /// cells, in which case the bottom face of the deepest cell is
    /// extrapolated.
    pub fn new(depth_t: Vec<f64>, mut depth_w: Vec<f64>) -> Result<Self, GridError> {
        let nz = depth_t.len();
        if nz == 0 {
            return Err(GridError::Vertical("no vertical levels".into()));
        }
        if depth_w.len() == nz {
            let bottom = 2.0 * depth_t[0] - depth_w[0];
            depth_w.insert(0, bottom);
        }
        if depth_w.len() != nz + 1 {
            return Err(GridError::Vertical(format!(
                "{} face depths for {} levels",
                depth_w.len(),
                nz
            )));
        }
        for k in 0..nz {
            if !(depth_w[k] >= depth_t[k] && depth_t[k] >= depth_w[k + 1]) {
                return Err(GridError::Vertical(format!(
                    "level {} not bracketed by its faces: {} / {} / {}",
                    k,
                    depth_w[k],
                    depth_t[k],
                    depth_w[k + 1]
                )));
            }
        }
        Ok(Self {
            depth_t,
            depth_w,
            e3t: None,
            e3u: None,
            e3v: None,
        })
    }

    /// Build from tracer depths only; faces sit halfway between levels.
    pub fn from_centers(depth_t: Vec<f64>) -> Result<Self, GridError> {
        let nz = depth_t.len();
        if nz == 0 {
            return Err(GridError::Vertical("no vertical levels".into()));
        }
        let mut depth_w = vec![0.0; nz + 1];
        for k in 1..nz {
            depth_w[k] = 0.5 * (depth_t[k - 1] + depth_t[k]);
        }
        depth_w[nz] = 0.0;
        depth_w[0] = 2.0 * depth_t[0] - depth_w[1];
        Self::new(depth_t, depth_w)
    }

    /// `nz` layers of equal thickness down to `total_depth`.
    pub fn uniform(nz: usize, total_depth: f64) -> Result<Self, GridError> {
        let dz = total_depth / nz.max(1) as f64;
        let depth_t = (0..nz).map(|k| (nz - k) as f64 * dz - 0.5 * dz).collect();
        let depth_w = (0..=nz).map(|k| (nz - k) as f64 * dz).collect();
        Self::new(depth_t, depth_w)
    }

    /// Attach per-cell thickness (partial steps).
    pub fn with_cell_thickness(mut self, e3t: Array3) -> Self {
        self.e3t = Some(e3t);
        self
    }

    /// Attach u- and v-face thickness.
    pub fn with_face_thickness(mut self, e3u: Array3, e3v: Array3) -> Self {
        self.e3u = Some(e3u);
        self.e3v = Some(e3v);
        self
    }

    #[inline]
    pub fn nz(&self) -> usize {
        self.depth_t.len()
    }

    pub fn depth_t(&self) -> &[f64] {
        &self.depth_t
    }

    pub fn depth_w(&self) -> &[f64] {
        &self.depth_w
    }

    pub fn cell_thickness_field(&self) -> Option<&Array3> {
        self.e3t.as_ref()
    }

    /// Depth (negative down) of a fractional level.
    pub fn z_to_depth(&self, z: f64) -> f64 {
        let nz = self.nz();
        let kz = z.min(nz as f64 - 1.00001).max(0.0);
        let k = kz.round() as usize;
        let dz = z - k as f64;
        let depth = if dz < 0.0 {
            self.depth_t[k] + 2.0 * (dz * (self.depth_t[k] - self.depth_w[k])).abs()
        } else {
            self.depth_t[k] - 2.0 * (dz * (self.depth_t[k] - self.depth_w[k + 1])).abs()
        };
        -depth
    }

    /// Fractional level of a depth (negative down).
    ///
    /// Levels reach half a cell either side of the tracer points: the
    /// surface maps to `nz - 0.5`, depths below the bottom face to `0`.
    pub fn depth_to_z(&self, depth: f64) -> f64 {
        let nz = self.nz();
        let depth = depth.min(0.0).abs();
        let (dt, dw) = (&self.depth_t, &self.depth_w);

        if depth <= dw[nz] {
            return self.surface_z();
        }
        for k in (0..nz).rev() {
            if depth <= dw[k] && depth > dt[k] {
                return k as f64 - 0.5 * ((dt[k] - depth) / (dt[k] - dw[k])).abs();
            }
            if depth <= dt[k] && depth > dw[k + 1] {
                return k as f64 + 0.5 * ((dt[k] - depth) / (dw[k + 1] - dt[k])).abs();
            }
        }
        0.0
    }

    /// Fractional level of the surface face.
    #[inline]
    pub fn surface_z(&self) -> f64 {
        self.nz() as f64 - 0.5
    }

    /// Thickness of cell `k` in column `(j, i)`.
    #[inline]
    pub fn cell_thickness(&self, k: usize, j: usize, i: usize) -> f64 {
        match &self.e3t {
            Some(e3t) => e3t.get(k, j, i),
            None => self.depth_w[k] - self.depth_w[k + 1],
        }
    }

    /// Thickness of the u face east of cell `(k, j, i)`.
    ///
    /// Without mesh values, the thinner of the two neighbouring cells.
    pub fn face_thickness_u(&self, k: usize, j: usize, i: usize) -> f64 {
        if let Some(e3u) = &self.e3u {
            return e3u.get(k, j, i);
        }
        let ie = match &self.e3t {
            Some(e3t) => (i + 1).min(e3t.nx() - 1),
            None => i,
        };
        self.cell_thickness(k, j, i).min(self.cell_thickness(k, j, ie))
    }

    /// Thickness of the v face north of cell `(k, j, i)`.
    pub fn face_thickness_v(&self, k: usize, j: usize, i: usize) -> f64 {
        if let Some(e3v) = &self.e3v {
            return e3v.get(k, j, i);
        }
        let jn = match &self.e3t {
            Some(e3t) => (j + 1).min(e3t.ny() - 1),
            None => j,
        };
        self.cell_thickness(k, j, i).min(self.cell_thickness(k, jn, i))
    }

    /// Distance between the faces below and above w level `kw`.
    #[inline]
    pub fn w_level_span(&self, kw: usize) -> f64 {
        let nz = self.nz();
        let below = self.depth_w[kw.saturating_sub(1)];
        let above = self.depth_w[(kw + 1).min(nz)];
        below - above
    }

    /// Keep columns `i0..i0+nx`, rows `j0..j0+ny`.
    pub fn crop(&self, j0: usize, i0: usize, ny: usize, nx: usize) -> Self {
        Self {
            depth_t: self.depth_t.clone(),
            depth_w: self.depth_w.clone(),
            e3t: self.e3t.as_ref().map(|e| e.crop(j0, i0, ny, nx)),
            e3u: self.e3u.as_ref().map(|e| e.crop(j0, i0, ny, nx)),
            e3v: self.e3v.as_ref().map(|e| e.crop(j0, i0, ny, nx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn levels() -> ZLevels {
        // Cells 0-40, 40-20, 20-10, 10-0 m (bottom first).
        ZLevels::new(
            vec![30.0, 15.0, 5.0],
            vec![40.0, 20.0, 10.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_whole_levels() {
        let z = levels();
        assert_relative_eq!(z.z_to_depth(1.0), -15.0);
        assert_relative_eq!(z.depth_to_z(-15.0), 1.0);
        assert_relative_eq!(z.z_to_depth(1.5), -10.0);
        assert_relative_eq!(z.z_to_depth(0.5), -20.0);
    }

    #[test]
    fn test_half_cell_round_trip() {
        let z = levels();
        for depth in [-6.0, -9.9, -12.0, -17.5, -22.0, -29.0, -34.0] {
            let k = z.depth_to_z(depth);
            assert_relative_eq!(z.z_to_depth(k), depth, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_top_half_cell_round_trip() {
        let z = levels();
        for depth in [-0.2, -1.0, -2.5, -4.9] {
            let k = z.depth_to_z(depth);
            assert!(k > 2.0 && k < 2.5);
            assert_relative_eq!(z.z_to_depth(k), depth, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_outside_column() {
        let z = levels();
        assert_eq!(z.depth_to_z(0.0), 2.5);
        assert_eq!(z.depth_to_z(3.0), 2.5);
        assert_eq!(z.depth_to_z(-100.0), 0.0);
    }

    #[test]
    fn test_missing_bottom_face_is_extrapolated() {
        let z = ZLevels::new(vec![30.0, 15.0, 5.0], vec![20.0, 10.0, 0.0]).unwrap();
        assert_eq!(z.depth_w()[0], 40.0);
        assert_relative_eq!(z.cell_thickness(0, 0, 0), 20.0);
        assert_relative_eq!(z.w_level_span(1), 30.0);
    }

    #[test]
    fn test_partial_steps_shape_faces() {
        let e3t = Array3::from_fn(3, 1, 2, |k, _, i| if k == 0 && i == 1 { 8.0 } else { 20.0 });
        let z = ZLevels::new(vec![30.0, 15.0, 5.0], vec![40.0, 20.0, 10.0, 0.0])
            .unwrap()
            .with_cell_thickness(e3t);
        assert_relative_eq!(z.cell_thickness(0, 0, 1), 8.0);
        assert_relative_eq!(z.face_thickness_u(0, 0, 0), 8.0);
        assert_relative_eq!(z.face_thickness_u(1, 0, 0), 20.0);
        assert_relative_eq!(z.face_thickness_v(0, 0, 1), 8.0);
    }

    #[test]
    fn test_uniform_levels() {
        let z = ZLevels::uniform(5, 50.0).unwrap();
        assert_eq!(z.depth_t(), &[45.0, 35.0, 25.0, 15.0, 5.0]);
        assert_relative_eq!(z.z_to_depth(4.0), -5.0);
        assert_relative_eq!(z.w_level_span(0), 10.0);
        assert_relative_eq!(z.w_level_span(2), 20.0);
    }
}
