//! Dense matrices and Gauss-Jordan elimination

use lexee_core::{FormulaError, FormulaResult};

/// Largest accepted dimension for inverse and determinant
pub const MAX_DIMENSION: usize = 50;

/// Pivots smaller than this mark the matrix as singular
pub const PIVOT_EPSILON: f64 = 1e-12;

/// Row-major dense matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Build from rows; every row must have the same, non-zero length
    pub fn from_rows(rows: &[Vec<f64>]) -> FormulaResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.is_empty() || cols == 0 {
            return Err(FormulaError::shape("matrix is empty"));
        }
        if rows.iter().any(|row| row.len() != cols) {
            return Err(FormulaError::shape("matrix rows have different lengths"));
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.cols.max(1)).map(<[f64]>::to_vec).collect()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// "RxC"
    pub fn dimensions(&self) -> String {
        format!("{}x{}", self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn transpose(&self) -> Self {
        let mut result = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                result.set(j, i, self.get(i, j));
            }
        }
        result
    }

    pub fn mul(&self, other: &Matrix) -> FormulaResult<Self> {
        if self.cols != other.rows {
            return Err(FormulaError::shape(format!(
                "incompatible dimensions {} and {}",
                self.dimensions(),
                other.dimensions()
            )));
        }
        let mut result = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let sum = (0..self.cols).map(|k| self.get(i, k) * other.get(k, j)).sum();
                result.set(i, j, sum);
            }
        }
        Ok(result)
    }

    /// Determinant by elimination with partial pivoting
    ///
    /// A singular matrix has determinant 0.0; this is not an error.
    pub fn determinant(&self) -> FormulaResult<f64> {
        self.check_square()?;
        let n = self.rows;
        let mut a = self.clone();
        let mut det = 1.0;

        for col in 0..n {
            let pivot_row = a.pivot_row(col);
            let pivot = a.get(pivot_row, col);
            if pivot.abs() < PIVOT_EPSILON {
                return Ok(0.0);
            }
            if pivot_row != col {
                a.swap_rows(pivot_row, col);
                det = -det;
            }
            det *= pivot;

            for row in col + 1..n {
                let factor = a.get(row, col) / pivot;
                if factor != 0.0 {
                    for k in col..n {
                        let v = a.get(row, k) - factor * a.get(col, k);
                        a.set(row, k, v);
                    }
                }
            }
        }
        Ok(det)
    }

    /// Inverse by Gauss-Jordan elimination on `[A | I]`
    pub fn inverse(&self) -> FormulaResult<Self> {
        self.check_square()?;
        let n = self.rows;
        let mut a = self.clone();
        let mut inv = Self::identity(n);

        for col in 0..n {
            let pivot_row = a.pivot_row(col);
            let pivot = a.get(pivot_row, col);
            if pivot.abs() < PIVOT_EPSILON {
                return Err(FormulaError::SingularMatrix);
            }
            if pivot_row != col {
                a.swap_rows(pivot_row, col);
                inv.swap_rows(pivot_row, col);
            }

            for k in 0..n {
                a.set(col, k, a.get(col, k) / pivot);
                inv.set(col, k, inv.get(col, k) / pivot);
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a.get(row, col);
                if factor == 0.0 {
                    continue;
                }
                for k in 0..n {
                    a.set(row, k, a.get(row, k) - factor * a.get(col, k));
                    inv.set(row, k, inv.get(row, k) - factor * inv.get(col, k));
                }
            }
        }
        Ok(inv)
    }

    fn check_square(&self) -> FormulaResult<()> {
        if self.rows != self.cols {
            return Err(FormulaError::shape(format!(
                "matrix must be square, got {}",
                self.dimensions()
            )));
        }
        if self.rows > MAX_DIMENSION {
            return Err(FormulaError::domain(format!(
                "matrix is larger than {}x{}",
                MAX_DIMENSION, MAX_DIMENSION
            )));
        }
        Ok(())
    }

    /// Row at or below `col` with the largest magnitude in column `col`
    fn pivot_row(&self, col: usize) -> usize {
        (col..self.rows)
            .max_by(|&a, &b| self.get(a, col).abs().total_cmp(&self.get(b, col).abs()))
            .unwrap_or(col)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for k in 0..self.cols {
            self.data.swap(a * self.cols + k, b * self.cols + k);
        }
    }
}
