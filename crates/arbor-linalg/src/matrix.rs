//! Fixed-shape dense matrix.
//!
//! [`Matrix`] owns its storage, so cloning deep-copies and no two values ever
//! share cells. Shape is fixed at construction; every binary operation checks
//! shapes and returns [`DimensionError`] on mismatch.

use std::fmt;
use std::ops::{Index, IndexMut};

use nalgebra::Vector3;
use rand::Rng;

use arbor_core::DimensionError;

/// Row-major dense `f32` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// All-zero matrix.
    ///
    /// # Panics
    ///
    /// Panics if `rows` or `cols` is zero.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "rows and cols must be > 0");
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Square identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        m.set_diagonal(1.0);
        m
    }

    /// Build from row slices. All rows must have the same, non-zero length.
    pub fn from_rows(rows: &[&[f32]]) -> Result<Self, DimensionError> {
        let cols = rows.first().map_or(0, |r| r.len());
        if rows.is_empty() || cols == 0 {
            return Err(DimensionError::new("from_rows", (rows.len(), cols), (1, 1)));
        }
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(DimensionError::new(
                    "from_rows",
                    (rows.len(), cols),
                    (1, row.len()),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Column vector (`n x 1`) from a slice.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn column(values: &[f32]) -> Self {
        assert!(!values.is_empty(), "column vector must not be empty");
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    /// `3 x 1` column vector.
    pub fn from_vector3(v: &Vector3<f32>) -> Self {
        Self::column(&[v.x, v.y, v.z])
    }

    pub const fn rows(&self) -> usize {
        self.rows
    }

    pub const fn cols(&self) -> usize {
        self.cols
    }

    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Row-major view of the cells.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copy of the cells as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.data.chunks(self.cols).map(<[f32]>::to_vec).collect()
    }

    /// Cell value, or `None` when out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    fn check_same_shape(&self, rhs: &Self, op: &'static str) -> Result<(), DimensionError> {
        if self.shape() == rhs.shape() {
            Ok(())
        } else {
            Err(DimensionError::new(op, self.shape(), rhs.shape()))
        }
    }

    fn zip_with(
        &self,
        rhs: &Self,
        op: &'static str,
        f: impl Fn(f32, f32) -> f32,
    ) -> Result<Self, DimensionError> {
        self.check_same_shape(rhs, op)?;
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&rhs.data).map(|(&a, &b)| f(a, b)).collect(),
        })
    }

    /// Elementwise sum.
    pub fn add(&self, rhs: &Self) -> Result<Self, DimensionError> {
        self.zip_with(rhs, "add", |a, b| a + b)
    }

    /// Elementwise difference.
    pub fn sub(&self, rhs: &Self) -> Result<Self, DimensionError> {
        self.zip_with(rhs, "sub", |a, b| a - b)
    }

    /// Elementwise (Hadamard) product.
    pub fn mul_elementwise(&self, rhs: &Self) -> Result<Self, DimensionError> {
        self.zip_with(rhs, "mul_elementwise", |a, b| a * b)
    }

    /// Elementwise quotient. Division by a zero cell follows IEEE rules.
    pub fn div_elementwise(&self, rhs: &Self) -> Result<Self, DimensionError> {
        self.zip_with(rhs, "div_elementwise", |a, b| a / b)
    }

    /// Every cell multiplied by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f32) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// Matrix product `self * rhs`.
    pub fn matmul(&self, rhs: &Self) -> Result<Self, DimensionError> {
        if self.cols != rhs.rows {
            return Err(DimensionError::new("matmul", self.shape(), rhs.shape()));
        }
        let mut res = Self::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a == 0.0 {
                    continue;
                }
                for j in 0..rhs.cols {
                    res.data[i * rhs.cols + j] += a * rhs.data[k * rhs.cols + j];
                }
            }
        }
        Ok(res)
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut res = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        res
    }

    /// Sum of elementwise products (Frobenius inner product).
    pub fn dot(&self, rhs: &Self) -> Result<f32, DimensionError> {
        self.check_same_shape(rhs, "dot")?;
        Ok(self.data.iter().zip(&rhs.data).map(|(a, b)| a * b).sum())
    }

    /// Euclidean (Frobenius) norm.
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Divide by the norm in place. A zero matrix is left unchanged.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            let inv = 1.0 / norm;
            self.data.iter_mut().for_each(|v| *v *= inv);
        }
    }

    /// Fill with values drawn uniformly from `[min, max)`.
    ///
    /// # Panics
    ///
    /// Panics if `min >= max`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R, min: f32, max: f32) {
        for v in &mut self.data {
            *v = rng.gen_range(min..max);
        }
    }

    /// Set the leading diagonal to `value`, leaving other cells untouched.
    pub fn set_diagonal(&mut self, value: f32) {
        for i in 0..self.rows.min(self.cols) {
            self.data[i * self.cols + i] = value;
        }
    }

    /// Flatten row-major into a `1 x (rows*cols)` row vector.
    #[must_use]
    pub fn to_row(&self) -> Self {
        Self {
            rows: 1,
            cols: self.data.len(),
            data: self.data.clone(),
        }
    }

    /// Flatten row-major into a `(rows*cols) x 1` column vector.
    #[must_use]
    pub fn to_column(&self) -> Self {
        Self {
            rows: self.data.len(),
            cols: 1,
            data: self.data.clone(),
        }
    }

    /// True when every cell is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        assert!(row < self.rows && col < self.cols, "index ({row}, {col}) out of range");
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f32 {
        assert!(row < self.rows && col < self.cols, "index ({row}, {col}) out of range");
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, row) in self.data.chunks(self.cols).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[")?;
            for (j, v) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{v}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
