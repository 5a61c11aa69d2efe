//! Terrain-following levels resolved on the horizontal grid.
//!
//! Rho and w depths are stored per column (`z_r[k][j][i]`, `z_w[k][j][i]`,
//! negative downward, bottom first). Conversions between depth and the
//! fractional level interpolate the level depths horizontally over the
//! wet columns around the point, then linearly between rho levels.

use super::SCoordinate;
use crate::grid::{Array2, Array3, GridError, LandMask};

/// Column-resolved terrain-following levels.
#[derive(Clone, Debug)]
pub struct TerrainLevels {
    z_r: Array3,
    z_w: Array3,
    /// True for columns whose surface cell is water.
    wet: Vec<bool>,
}

impl TerrainLevels {
    pub fn new(z_r: Array3, z_w: Array3, mask: &LandMask) -> Result<Self, GridError> {
        let (nz, ny, nx) = (z_r.nz(), z_r.ny(), z_r.nx());
        if z_w.nz() != nz + 1 || z_w.ny() != ny || z_w.nx() != nx {
            return Err(GridError::Shape {
                name: "z_w".into(),
                expected: vec![nz + 1, ny, nx],
                found: vec![z_w.nz(), z_w.ny(), z_w.nx()],
            });
        }
        if mask.ny() != ny || mask.nx() != nx {
            return Err(GridError::Shape {
                name: "mask".into(),
                expected: vec![ny, nx],
                found: vec![mask.ny(), mask.nx()],
            });
        }
        let mut wet = Vec::with_capacity(ny * nx);
        for j in 0..ny {
            for i in 0..nx {
                wet.push(mask.is_wet_surface(j as isize, i as isize));
            }
        }
        Ok(Self { z_r, z_w, wet })
    }

    #[inline]
    pub fn nz(&self) -> usize {
        self.z_r.nz()
    }

    pub fn z_r(&self) -> &Array3 {
        &self.z_r
    }

    pub fn z_w(&self) -> &Array3 {
        &self.z_w
    }

    /// Depth of rho level `k` at a horizontal position.
    ///
    /// Bilinear over the wet columns of the cell containing the point; NaN
    /// if none of them is wet.
    pub fn level_depth(&self, x: f64, y: f64, k: usize) -> f64 {
        let (ny, nx) = (self.z_r.ny(), self.z_r.nx());
        let i = x.floor() as isize;
        let j = y.floor() as isize;
        let dx = x - i as f64;
        let dy = y - j as f64;

        let mut value = 0.0;
        let mut co_total = 0.0;
        for ii in 0..2 {
            for jj in 0..2 {
                let (ci, cj) = (i + ii, j + jj);
                if ci < 0 || cj < 0 || ci as usize >= nx || cj as usize >= ny {
                    continue;
                }
                let (ci, cj) = (ci as usize, cj as usize);
                if !self.wet[cj * nx + ci] {
                    continue;
                }
                let co = ((1.0 - ii as f64 - dx) * (1.0 - jj as f64 - dy)).abs();
                value += co * self.z_r.get(k, cj, ci);
                co_total += co;
            }
        }
        if co_total > 0.0 {
            value / co_total
        } else {
            f64::NAN
        }
    }

    /// Depth (negative down) of a fractional level.
    pub fn z_to_depth(&self, x: f64, y: f64, z: f64) -> f64 {
        let nz = self.nz();
        if nz == 1 {
            return self.level_depth(x, y, 0);
        }
        let kz = z.min(nz as f64 - 1.00001).max(0.0);
        let k = kz.floor() as usize;
        let dz = kz - k as f64;
        (1.0 - dz) * self.level_depth(x, y, k) + dz * self.level_depth(x, y, k + 1)
    }

    /// Fractional level of a depth (negative down).
    ///
    /// Depths above the shallowest rho level map to `nz - 1`, depths below
    /// the deepest one to `0`.
    pub fn depth_to_z(&self, x: f64, y: f64, depth: f64) -> f64 {
        let nz = self.nz();
        let depth = depth.min(0.0);
        let mut lk = nz - 1;
        while lk > 0 && self.level_depth(x, y, lk) > depth {
            lk -= 1;
        }
        if lk == nz - 1 {
            return (nz - 1) as f64;
        }
        let pr = self.level_depth(x, y, lk);
        let z = lk as f64 + (depth - pr) / (self.level_depth(x, y, lk + 1) - pr);
        z.max(0.0)
    }

    /// Thickness of cell `k` in column `(j, i)`.
    #[inline]
    pub fn cell_thickness(&self, k: usize, j: usize, i: usize) -> f64 {
        self.z_w.get(k + 1, j, i) - self.z_w.get(k, j, i)
    }

    /// Distance between the faces below and above w level `kw`.
    #[inline]
    pub fn w_level_span(&self, kw: usize, j: usize, i: usize) -> f64 {
        let nz = self.nz();
        self.z_w.get((kw + 1).min(nz), j, i) - self.z_w.get(kw.saturating_sub(1), j, i)
    }

    /// W depths moved by a free-surface elevation.
    pub fn w_levels_with_zeta(&self, zeta: &Array2) -> Array3 {
        let nz = self.nz();
        Array3::from_fn(nz + 1, self.z_w.ny(), self.z_w.nx(), |k, j, i| {
            let h = -self.z_w.get(0, j, i);
            SCoordinate::with_free_surface(self.z_w.get(k, j, i), h, zeta.get(j, i))
        })
    }

    /// Water depth of a column (positive).
    pub fn column_depth(&self, j: usize, i: usize) -> f64 {
        self.z_w.get(self.nz(), j, i) - self.z_w.get(0, j, i)
    }

    /// Keep columns `i0..i0+nx`, rows `j0..j0+ny`.
    pub fn crop(&self, j0: usize, i0: usize, ny: usize, nx: usize) -> Self {
        let full_nx = self.z_r.nx();
        let wet = Array2::from_fn(ny, nx, |j, i| {
            if self.wet[(j0 + j) * full_nx + i0 + i] {
                1.0
            } else {
                0.0
            }
        });
        Self {
            z_r: self.z_r.crop(j0, i0, ny, nx),
            z_w: self.z_w.crop(j0, i0, ny, nx),
            wet: wet.iter().map(|&v| v > 0.0).collect(),
        }
    }
}
