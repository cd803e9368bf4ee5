use log::debug;
use num_traits::NumAssign;
use rayon::prelude::*;
use spmm_dense::DenseMatrix;
use spmm_matrix::{check_conformable, Matrix, MatrixError};

use crate::CanonicalCoo;

// c += a * b, elementwise over a row
#[inline]
fn axpy<T: NumAssign + Copy>(c: &mut [T], a: T, b: &[T]) {
    for (cj, &bj) in c.iter_mut().zip(b) {
        *cj += a * bj;
    }
}

impl<T: NumAssign + Copy + Send + Sync> CanonicalCoo<T> {
    /// Sparse by dense product. Every entry of `self` touches a full row of
    /// the output, so the result is dense.
    pub fn mul_dense(&self, rhs: &DenseMatrix<T>) -> Result<DenseMatrix<T>, MatrixError> {
        let shape = check_conformable(self.shape(), rhs.shape())?;
        let mut out = DenseMatrix::zeros(shape);
        let n = shape.1;
        if self.nnz() == 0 || n == 0 {
            return Ok(out);
        }
        debug!("mul_dense: {} entries by {} columns", self.nnz(), n);
        let c = out.as_mut_slice();
        for (&(i, t), &a) in self.coords.iter().zip(&self.vals) {
            axpy(&mut c[i * n..(i + 1) * n], a, rhs.row(t));
        }
        Ok(out)
    }

    /// Like [`CanonicalCoo::mul_dense`], one rayon task per output row.
    pub fn par_mul_dense(&self, rhs: &DenseMatrix<T>) -> Result<DenseMatrix<T>, MatrixError> {
        let shape = check_conformable(self.shape(), rhs.shape())?;
        let mut out = DenseMatrix::zeros(shape);
        let n = shape.1;
        if self.nnz() == 0 || n == 0 {
            return Ok(out);
        }
        debug!("par_mul_dense: {} entries by {} columns", self.nnz(), n);
        let offsets = self.row_offsets();
        out.as_mut_slice()
            .par_chunks_mut(n)
            .enumerate()
            .for_each(|(i, crow)| {
                let (lo, hi) = (offsets[i], offsets[i + 1]);
                for (&(_, t), &a) in self.coords[lo..hi].iter().zip(&self.vals[lo..hi]) {
                    axpy(crow, a, rhs.row(t));
                }
            });
        Ok(out)
    }
}

/// Dense by sparse product: every entry (t, j, b) of `rhs` adds `A[i, t] * b`
/// to column j of each output row i.
pub fn dense_mul_sparse<T: NumAssign + Copy>(
    lhs: &DenseMatrix<T>,
    rhs: &CanonicalCoo<T>,
) -> Result<DenseMatrix<T>, MatrixError> {
    let shape = check_conformable(lhs.shape(), rhs.shape())?;
    let mut out = DenseMatrix::zeros(shape);
    if rhs.nnz() == 0 || shape.1 == 0 {
        return Ok(out);
    }
    debug!("dense_mul_sparse: {} rows by {} entries", shape.0, rhs.nnz());
    for i in 0..shape.0 {
        let arow = lhs.row(i);
        for (&(t, j), &b) in rhs.coords.iter().zip(&rhs.vals) {
            out[(i, j)] += arow[t] * b;
        }
    }
    Ok(out)
}

pub fn par_dense_mul_sparse<T: NumAssign + Copy + Send + Sync>(
    lhs: &DenseMatrix<T>,
    rhs: &CanonicalCoo<T>,
) -> Result<DenseMatrix<T>, MatrixError> {
    let shape = check_conformable(lhs.shape(), rhs.shape())?;
    let mut out = DenseMatrix::zeros(shape);
    let n = shape.1;
    if rhs.nnz() == 0 || n == 0 {
        return Ok(out);
    }
    debug!("par_dense_mul_sparse: {} rows by {} entries", shape.0, rhs.nnz());
    out.as_mut_slice()
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(i, crow)| {
            let arow = lhs.row(i);
            for (&(t, j), &b) in rhs.coords.iter().zip(&rhs.vals) {
                crow[j] += arow[t] * b;
            }
        });
    Ok(out)
}
