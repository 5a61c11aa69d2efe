//! Flat row-major 2-D and 3-D arrays.
//!
//! Fields are stored as contiguous `Vec<f64>` in `[k][j][i]` order (i
//! fastest), the layout the archives deliver. Signed accessors return
//! `None` outside the array so that stencils can report a domain exit
//! instead of panicking.

/// 2-D array indexed `[j][i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Array2 {
    ny: usize,
    nx: usize,
    data: Vec<f64>,
}

impl Array2 {
    /// Array filled with a constant.
    pub fn filled(ny: usize, nx: usize, value: f64) -> Self {
        Self {
            ny,
            nx,
            data: vec![value; ny * nx],
        }
    }

    /// Wrap row-major data. Returns `None` on a length mismatch.
    pub fn from_vec(ny: usize, nx: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == ny * nx).then_some(Self { ny, nx, data })
    }

    /// Build from a function of `(j, i)`.
    pub fn from_fn(ny: usize, nx: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(ny * nx);
        for j in 0..ny {
            for i in 0..nx {
                data.push(f(j, i));
            }
        }
        Self { ny, nx, data }
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn get(&self, j: usize, i: usize) -> f64 {
        self.data[j * self.nx + i]
    }

    #[inline]
    pub fn set(&mut self, j: usize, i: usize, value: f64) {
        self.data[j * self.nx + i] = value;
    }

    /// Bounds-checked access with signed indices.
    #[inline]
    pub fn checked(&self, j: isize, i: isize) -> Option<f64> {
        if j < 0 || i < 0 || j as usize >= self.ny || i as usize >= self.nx {
            None
        } else {
            Some(self.get(j as usize, i as usize))
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.data.iter()
    }

    /// Sub-array of rows `j0..j0+ny`, columns `i0..i0+nx`, clipped to the array.
    pub fn crop(&self, j0: usize, i0: usize, ny: usize, nx: usize) -> Self {
        let ny = ny.min(self.ny.saturating_sub(j0));
        let nx = nx.min(self.nx.saturating_sub(i0));
        Self::from_fn(ny, nx, |j, i| self.get(j0 + j, i0 + i))
    }
}

/// 3-D array indexed `[k][j][i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Array3 {
    nz: usize,
    ny: usize,
    nx: usize,
    data: Vec<f64>,
}

impl Array3 {
    pub fn filled(nz: usize, ny: usize, nx: usize, value: f64) -> Self {
        Self {
            nz,
            ny,
            nx,
            data: vec![value; nz * ny * nx],
        }
    }

    pub fn zeros(nz: usize, ny: usize, nx: usize) -> Self {
        Self::filled(nz, ny, nx, 0.0)
    }

    /// Wrap row-major data. Returns `None` on a length mismatch.
    pub fn from_vec(nz: usize, ny: usize, nx: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == nz * ny * nx).then_some(Self { nz, ny, nx, data })
    }

    /// Build from a function of `(k, j, i)`.
    pub fn from_fn(
        nz: usize,
        ny: usize,
        nx: usize,
        mut f: impl FnMut(usize, usize, usize) -> f64,
    ) -> Self {
        let mut data = Vec::with_capacity(nz * ny * nx);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    data.push(f(k, j, i));
                }
            }
        }
        Self { nz, ny, nx, data }
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

    #[inline]
    fn offset(&self, k: usize, j: usize, i: usize) -> usize {
        (k * self.ny + j) * self.nx + i
    }

    #[inline]
    pub fn get(&self, k: usize, j: usize, i: usize) -> f64 {
        self.data[self.offset(k, j, i)]
    }

    #[inline]
    pub fn set(&mut self, k: usize, j: usize, i: usize, value: f64) {
        let o = self.offset(k, j, i);
        self.data[o] = value;
    }

    /// Bounds-checked access with signed indices.
    #[inline]
    pub fn checked(&self, k: isize, j: isize, i: isize) -> Option<f64> {
        if k < 0
            || j < 0
            || i < 0
            || k as usize >= self.nz
            || j as usize >= self.ny
            || i as usize >= self.nx
        {
            None
        } else {
            Some(self.get(k as usize, j as usize, i as usize))
        }
    }

    /// Reverse the level order (surface-first archives to bottom-first).
    pub fn flip_levels(&mut self) {
        let plane = self.ny * self.nx;
        for k in 0..self.nz / 2 {
            let top = self.nz - 1 - k;
            for o in 0..plane {
                self.data.swap(k * plane + o, top * plane + o);
            }
        }
    }

    /// Copy of one horizontal level.
    pub fn level(&self, k: usize) -> Array2 {
        let plane = self.ny * self.nx;
        Array2 {
            ny: self.ny,
            nx: self.nx,
            data: self.data[k * plane..(k + 1) * plane].to_vec(),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Sub-array of rows `j0..j0+ny`, columns `i0..i0+nx` on every level,
    /// clipped to the array.
    pub fn crop(&self, j0: usize, i0: usize, ny: usize, nx: usize) -> Self {
        let ny = ny.min(self.ny.saturating_sub(j0));
        let nx = nx.min(self.nx.saturating_sub(i0));
        Self::from_fn(self.nz, ny, nx, |k, j, i| self.get(k, j0 + j, i0 + i))
    }
}
