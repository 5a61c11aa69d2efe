//! Land/water masking for 3-D ocean grids.
//!
//! Every tracer cell is classified as water or land on every level. Grids
//! that only ship a 2-D mask broadcast it to all levels.

use super::array::{Array2, Array3};

/// Land mask on tracer points, indexed `[k][j][i]`, `k = 0` at the bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct LandMask {
    nz: usize,
    ny: usize,
    nx: usize,
    /// True if the cell is water.
    wet: Vec<bool>,
}

impl LandMask {
    /// Create a mask where all cells are wet.
    pub fn all_wet(nz: usize, ny: usize, nx: usize) -> Self {
        Self {
            nz,
            ny,
            nx,
            wet: vec![true; nz * ny * nx],
        }
    }

    /// Mask from a 3-D field of 0/1 values (any value > 0 is water).
    pub fn from_levels(values: &Array3) -> Self {
        Self {
            nz: values.nz(),
            ny: values.ny(),
            nx: values.nx(),
            wet: values.as_slice().iter().map(|&v| v > 0.0).collect(),
        }
    }

    /// Broadcast a 2-D 0/1 mask to `nz` levels.
    pub fn from_surface(values: &Array2, nz: usize) -> Self {
        let plane: Vec<bool> = values.as_slice().iter().map(|&v| v > 0.0).collect();
        let mut wet = Vec::with_capacity(nz * plane.len());
        for _ in 0..nz {
            wet.extend_from_slice(&plane);
        }
        Self {
            nz,
            ny: values.ny(),
            nx: values.nx(),
            wet,
        }
    }

    /// Water wherever a sample field holds a finite value.
    pub fn from_finite(sample: &Array3) -> Self {
        Self {
            nz: sample.nz(),
            ny: sample.ny(),
            nx: sample.nx(),
            wet: sample.as_slice().iter().map(|v| v.is_finite()).collect(),
        }
    }

    #[inline]
    pub fn nz(&self) -> usize {
        self.nz
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Water test with signed indices; anything outside the array is land.
    #[inline]
    pub fn is_wet(&self, k: isize, j: isize, i: isize) -> bool {
        if k < 0
            || j < 0
            || i < 0
            || k as usize >= self.nz
            || j as usize >= self.ny
            || i as usize >= self.nx
        {
            return false;
        }
        self.wet[(k as usize * self.ny + j as usize) * self.nx + i as usize]
    }

    /// Water test on the surface level.
    #[inline]
    pub fn is_wet_surface(&self, j: isize, i: isize) -> bool {
        self.is_wet(self.nz as isize - 1, j, i)
    }

    /// Lowest wet level of a column, if any.
    pub fn first_wet_level(&self, j: usize, i: usize) -> Option<usize> {
        (0..self.nz).find(|&k| self.is_wet(k as isize, j as isize, i as isize))
    }

    /// Number of wet cells.
    pub fn wet_count(&self) -> usize {
        self.wet.iter().filter(|&&w| w).count()
    }

    /// Fraction of wet cells (0.0 to 1.0).
    pub fn wet_fraction(&self) -> f64 {
        if self.wet.is_empty() {
            0.0
        } else {
            self.wet_count() as f64 / self.wet.len() as f64
        }
    }

    /// Mark a cell as land.
    pub fn set_dry(&mut self, k: usize, j: usize, i: usize) {
        self.wet[(k * self.ny + j) * self.nx + i] = false;
    }

    /// Sub-mask of rows `j0..j0+ny`, columns `i0..i0+nx`, clipped to the mask.
    pub fn crop(&self, j0: usize, i0: usize, ny: usize, nx: usize) -> Self {
        let ny = ny.min(self.ny.saturating_sub(j0));
        let nx = nx.min(self.nx.saturating_sub(i0));
        let mut wet = Vec::with_capacity(self.nz * ny * nx);
        for k in 0..self.nz {
            for j in 0..ny {
                let row = (k * self.ny + j0 + j) * self.nx + i0;
                wet.extend_from_slice(&self.wet[row..row + nx]);
            }
        }
        Self {
            nz: self.nz,
            ny,
            nx,
            wet,
        }
    }

    /// Mark a whole column as land.
    pub fn set_column_dry(&mut self, j: usize, i: usize) {
        for k in 0..self.nz {
            self.set_dry(k, j, i);
        }
    }
}
