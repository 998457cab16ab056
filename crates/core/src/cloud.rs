/// A point cloud stored as structure-of-arrays.
///
/// Positions are `f64`; colors are optional and index-aligned with the
/// positions when present. Point order carries no meaning beyond index
/// identity within a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub colors: Option<Colors>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Colors {
    pub r: Vec<u8>,
    pub g: Vec<u8>,
    pub b: Vec<u8>,
}

/// Per-point surface normals, index-aligned with a source [`PointCloud`].
///
/// `valid[i]` is false when the normal at `i` could not be estimated
/// (too few neighbors); such points must be skipped by consumers that
/// rely on normal directions.
#[derive(Debug, Clone, PartialEq)]
pub struct Normals {
    pub nx: Vec<f64>,
    pub ny: Vec<f64>,
    pub nz: Vec<f64>,
    pub valid: Vec<bool>,
}

impl Normals {
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.nx.len(), self.ny.len());
        debug_assert_eq!(self.nx.len(), self.nz.len());
        debug_assert_eq!(self.nx.len(), self.valid.len());
        self.nx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nx.is_empty()
    }

    pub fn normal(&self, i: usize) -> [f64; 3] {
        [self.nx[i], self.ny[i], self.nz[i]]
    }

    pub fn is_valid(&self, i: usize) -> bool {
        self.valid[i]
    }
}

impl PointCloud {
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            colors: None,
        }
    }

    pub fn from_xyz(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "x and y must have same length");
        assert_eq!(x.len(), z.len(), "x and z must have same length");

        Self {
            x,
            y,
            z,
            colors: None,
        }
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.x.len(), self.y.len());
        debug_assert_eq!(self.x.len(), self.z.len());
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn point(&self, i: usize) -> [f64; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    pub fn iter_points(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| [*x, *y, *z])
    }

    /// Materialize the subset of points at the given indices, preserving
    /// index order. Colors follow the selection when present.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut x = Vec::with_capacity(indices.len());
        let mut y = Vec::with_capacity(indices.len());
        let mut z = Vec::with_capacity(indices.len());

        for &idx in indices {
            assert!(idx < self.len(), "index out of bounds in select");
            x.push(self.x[idx]);
            y.push(self.y[idx]);
            z.push(self.z[idx]);
        }

        let colors = self.colors.as_ref().map(|c| Colors {
            r: indices.iter().map(|&idx| c.r[idx]).collect(),
            g: indices.iter().map(|&idx| c.g[idx]).collect(),
            b: indices.iter().map(|&idx| c.b[idx]).collect(),
        });

        Self { x, y, z, colors }
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}
