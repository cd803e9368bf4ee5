#![deny(clippy::disallowed_methods)]

use conv::prelude::*;
use itertools::{iproduct, Itertools};
use num_traits::{Num, NumAssign};
#[cfg(feature = "proptest-arbitrary")]
use proptest::prelude::*;
use spmm_matrix::{check_bounds, check_conformable, Matrix, MatrixError, Pos, Shape};
use std::{
    iter::repeat_with,
    ops::{Index, IndexMut, Sub},
};

mod matrix_market;

pub use matrix_market::{
    parse_matrix_market, write_matrix_market, FromMatrixMarketError, MatrixType, Triplets,
};

/// A row-major dense matrix. Used as the dense operand of a product and as
/// the reference every sparse product is tested against.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct DenseMatrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> DenseMatrix<T> {
    pub fn from_row_major((rows, cols): Shape, data: Vec<T>) -> Result<Self, MatrixError> {
        let cells = rows.checked_mul(cols).unwrap_or(usize::MAX);
        if cells != data.len() {
            return Err(MatrixError::LengthMismatch {
                coords: cells,
                vals: data.len(),
            });
        }
        Ok(DenseMatrix { rows, cols, data })
    }

    pub fn get(&self, (i, j): Pos) -> Option<&T> {
        (i < self.rows && j < self.cols).then(|| &self.data[i * self.cols + j])
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    // every cell, in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Pos, &T)> {
        let cols = self.cols;
        self.data
            .iter()
            .enumerate()
            .map(move |(k, t)| ((k / cols, k % cols), t))
    }
}

impl<T: Num> DenseMatrix<T> {
    pub fn zeros((rows, cols): Shape) -> Self {
        DenseMatrix {
            rows,
            cols,
            data: repeat_with(T::zero).take(rows * cols).collect(),
        }
    }

    // non-zero cells, in row-major order
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (Pos, &T)> {
        self.iter().filter(|(_, t)| !t.is_zero())
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(T::is_zero)
    }
}

impl<T: NumAssign + Copy> DenseMatrix<T> {
    /// Textbook triple loop product.
    pub fn product(&self, rhs: &Self) -> Result<Self, MatrixError> {
        let shape = check_conformable(self.shape(), rhs.shape())?;
        let mut m = DenseMatrix::zeros(shape);
        for (i, j) in iproduct!(0..self.rows, 0..rhs.cols) {
            let mut t = T::zero();
            for k in 0..self.cols {
                t += self[(i, k)] * rhs[(k, j)];
            }
            m[(i, j)] = t;
        }
        Ok(m)
    }

    pub fn transpose(&self) -> Self {
        let mut m = DenseMatrix::zeros((self.cols, self.rows));
        for ((i, j), &t) in self.iter() {
            m[(j, i)] = t;
        }
        m
    }
}

impl DenseMatrix<f64> {
    pub fn debug_in_scientific_notation(&self) -> String {
        let mut s = String::from("{");
        s.push_str(
            &self
                .iter_nonzero()
                .map(|((i, j), t)| format!("({}, {}, {:e})", i, j, t))
                .join(", "),
        );
        s.push('}');
        s
    }
}

#[derive(Debug)]
pub struct IsNan;
impl DenseMatrix<f64> {
    fn inf_norm(&self) -> Result<f64, IsNan> {
        let mut max = 0.0;
        for rsum in (0..self.rows).map(|r| self.row(r).iter().map(|t| t.abs()).sum::<f64>()) {
            if rsum.is_nan() {
                return Err(IsNan);
            } else if rsum > max {
                max = rsum;
            }
        }
        Ok(max)
    }

    // see (3.13) from Accuracy and stability of numerical algorithms by Higham
    pub fn good_matrix_approx(&self, rhs: &Self, approx: &Self) -> Result<bool, IsNan> {
        let expected = match self.product(rhs) {
            Ok(expected) if expected.shape() == approx.shape() => expected,
            _ => return Ok(false),
        };
        let n = f64::value_from(self.cols.max(1)).map_err(|_| IsNan)?;
        let u = f64::EPSILON / 2.0;
        let gamma = n * u / (1.0 - n * u);
        if expected.data.iter().all(|t| !t.is_nan()) && approx.data.iter().any(|t| t.is_nan()) {
            Ok(false)
        } else {
            let self_norm = self.inf_norm()?;
            let rhs_norm = rhs.inf_norm()?;
            Ok((expected - approx.clone()).inf_norm()?
                <= 2.0
                    * gamma
                    * if self_norm == 0.0 || rhs_norm == 0.0 {
                        // don't want 0.0*inf to become NaN
                        0.0
                    } else {
                        self_norm * rhs_norm
                    })
        }
    }
}

impl<T> Index<Pos> for DenseMatrix<T> {
    type Output = T;

    fn index(&self, (i, j): Pos) -> &T {
        assert!(i < self.rows && j < self.cols, "index ({}, {}) out of bounds", i, j);
        &self.data[i * self.cols + j]
    }
}

impl<T> IndexMut<Pos> for DenseMatrix<T> {
    fn index_mut(&mut self, (i, j): Pos) -> &mut T {
        assert!(i < self.rows && j < self.cols, "index ({}, {}) out of bounds", i, j);
        &mut self.data[i * self.cols + j]
    }
}

impl<T: Num> Sub for DenseMatrix<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        assert_eq!(
            (self.rows, self.cols),
            (rhs.rows, rhs.cols),
            "matrices must have identical dimensions"
        );
        DenseMatrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .into_iter()
                .zip(rhs.data)
                .map(|(t1, t2)| t1 - t2)
                .collect(),
        }
    }
}

impl<T: NumAssign + Copy> Matrix<T> for DenseMatrix<T> {
    // a dense matrix has a cell for every position, nothing else to check
    fn invariants(&self) -> bool {
        self.data.len() == self.rows * self.cols
    }

    fn new(shape: Shape) -> Self {
        DenseMatrix::zeros(shape)
    }

    fn identity(n: usize) -> Self {
        let mut m = DenseMatrix::zeros((n, n));
        for i in 0..n {
            m[(i, i)] = T::one();
        }
        m
    }

    fn from_triplets(shape: Shape, entries: Vec<(Pos, T)>) -> Result<Self, MatrixError> {
        let mut m = DenseMatrix::zeros(shape);
        for (pos, t) in entries {
            check_bounds(pos, shape)?;
            m[pos] += t;
        }
        Ok(m)
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn nnz(&self) -> usize {
        self.data.len()
    }

    fn get_element(&self, pos: Pos) -> Result<T, MatrixError> {
        check_bounds(pos, self.shape())?;
        Ok(self[pos])
    }
}

#[cfg(feature = "proptest-arbitrary")]
impl<T: Arbitrary + NumAssign + Copy> DenseMatrix<T> {
    pub fn arb_fixed_size_matrix(shape: Shape) -> impl Strategy<Value = Self> {
        spmm_matrix::proptest::arb_fixed_size_matrix(shape, any::<T>)
    }

    pub fn arb_matrix() -> impl Strategy<Value = Self> {
        spmm_matrix::proptest::arb_matrix(any::<T>)
    }
}
