#![deny(clippy::disallowed_methods)]

#[cfg(feature = "test")]
use cap_rand::prelude::*;
use itertools::Itertools;
use num_traits::NumAssign;
use spmm_dense::{DenseMatrix, Triplets};
use spmm_matrix::{check_bounds, Matrix, MatrixError, Pos, Shape};
use std::{iter::repeat_with, vec};

mod mul_dense;
mod mul_merge;
mod operand;
#[cfg(test)]
mod tests;

pub use mul_dense::{dense_mul_sparse, par_dense_mul_sparse};
pub use operand::{multiply, multiply_with, par_multiply, Kind, MulOptions, Operand, Product};

/// A sparse matrix in coordinate format.
///
/// When `CANONICAL` is true the coordinates are strictly increasing in
/// (row, col) order and no stored value is zero. Otherwise positions may
/// repeat, in any order, and the logical value at a position is the sum of
/// every value stored there.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CooMatrix<T, const CANONICAL: bool> {
    rows: usize,
    cols: usize,
    coords: Vec<Pos>,
    vals: Vec<T>,
}

pub type Coo<T> = CooMatrix<T, false>;
pub type CanonicalCoo<T> = CooMatrix<T, true>;

impl<T, const CANONICAL: bool> CooMatrix<T, CANONICAL> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> Shape {
        (self.rows, self.cols)
    }

    pub fn nnz(&self) -> usize {
        self.coords.len()
    }

    pub fn coords(&self) -> &[Pos] {
        &self.coords
    }

    pub fn vals(&self) -> &[T] {
        &self.vals
    }

    // stored entries, in storage order
    pub fn iter(&self) -> impl Iterator<Item = (Pos, &T)> + Clone {
        self.coords.iter().copied().zip(self.vals.iter())
    }

    // fraction of positions with a stored entry, counting repeats
    pub fn density(&self) -> f64 {
        let cells = self.rows as f64 * self.cols as f64;
        if cells == 0.0 {
            0.0
        } else {
            self.nnz() as f64 / cells
        }
    }

    pub fn into_uncanonical(self) -> Coo<T> {
        CooMatrix {
            rows: self.rows,
            cols: self.cols,
            coords: self.coords,
            vals: self.vals,
        }
    }

    fn invariant1(&self) -> bool {
        self.coords.len() == self.vals.len()
    }

    fn invariant2(&self) -> bool {
        self.coords
            .iter()
            .all(|&pos| check_bounds(pos, self.shape()).is_ok())
    }

    fn invariant3(&self) -> bool {
        !CANONICAL || is_increasing(&self.coords)
    }
}

impl<T> Coo<T> {
    /// Builds a matrix from parallel coordinate and value vectors. Positions
    /// need not be sorted or distinct.
    pub fn from_triplets(shape: Shape, coords: Vec<Pos>, vals: Vec<T>) -> Result<Self, MatrixError> {
        if coords.len() != vals.len() {
            return Err(MatrixError::LengthMismatch {
                coords: coords.len(),
                vals: vals.len(),
            });
        }
        for &pos in &coords {
            check_bounds(pos, shape)?;
        }
        Ok(CooMatrix {
            rows: shape.0,
            cols: shape.1,
            coords,
            vals,
        })
    }
}

impl<T> CanonicalCoo<T> {
    // offsets[i]..offsets[i + 1] is the range of entries in row i
    pub(crate) fn row_offsets(&self) -> Vec<usize> {
        (0..=self.rows)
            .map(|r| self.coords.partition_point(|&(i, _)| i < r))
            .collect()
    }
}

impl<T: NumAssign + Copy> CanonicalCoo<T> {
    pub fn from_dense(m: &DenseMatrix<T>) -> Self {
        let (coords, vals) = m.iter_nonzero().map(|(pos, &t)| (pos, t)).unzip();
        CooMatrix {
            rows: m.rows(),
            cols: m.cols(),
            coords,
            vals,
        }
    }
}

impl<T: NumAssign + Copy, const CANONICAL: bool> CooMatrix<T, CANONICAL> {
    fn invariant4(&self) -> bool {
        !CANONICAL || self.vals.iter().all(|t| !t.is_zero())
    }

    /// Sorts the entries, sums repeated positions and drops zeros.
    pub fn canonicalize(&self) -> CanonicalCoo<T> {
        self.clone().into_canonical()
    }

    pub fn into_canonical(self) -> CanonicalCoo<T> {
        let (coords, vals) = if CANONICAL {
            (self.coords, self.vals)
        } else {
            coalesce(self.coords.into_iter().zip(self.vals).collect())
        };
        CooMatrix {
            rows: self.rows,
            cols: self.cols,
            coords,
            vals,
        }
    }

    pub fn to_dense(&self) -> DenseMatrix<T> {
        let mut m = DenseMatrix::zeros(self.shape());
        for (pos, &t) in self.iter() {
            m[pos] += t;
        }
        m
    }

    pub fn to_triplets(&self) -> Triplets<T> {
        Triplets {
            shape: self.shape(),
            entries: self.iter().map(|(pos, &t)| (pos, t)).collect(),
        }
    }

    pub fn transpose(&self) -> Self {
        let mut entries: Vec<_> = self.iter().map(|((i, j), &t)| ((j, i), t)).collect();
        if CANONICAL {
            entries.sort_unstable_by_key(|&(pos, _)| pos);
        }
        let (coords, vals) = entries.into_iter().unzip();
        CooMatrix {
            rows: self.cols,
            cols: self.rows,
            coords,
            vals,
        }
    }
}

impl<T: NumAssign + Copy, const CANONICAL: bool> Matrix<T> for CooMatrix<T, CANONICAL> {
    fn invariants(&self) -> bool {
        self.invariant1() && self.invariant2() && self.invariant3() && self.invariant4()
    }

    fn new((rows, cols): Shape) -> Self {
        CooMatrix {
            rows,
            cols,
            coords: vec![],
            vals: vec![],
        }
    }

    fn identity(n: usize) -> Self {
        CooMatrix {
            rows: n,
            cols: n,
            coords: (0..n).map(|i| (i, i)).collect(),
            vals: repeat_with(T::one).take(n).collect(),
        }
    }

    fn from_triplets(shape: Shape, entries: Vec<(Pos, T)>) -> Result<Self, MatrixError> {
        for &(pos, _) in &entries {
            check_bounds(pos, shape)?;
        }
        let (coords, vals) = if CANONICAL {
            coalesce(entries)
        } else {
            entries.into_iter().unzip()
        };
        Ok(CooMatrix {
            rows: shape.0,
            cols: shape.1,
            coords,
            vals,
        })
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn nnz(&self) -> usize {
        self.coords.len()
    }

    fn get_element(&self, pos: Pos) -> Result<T, MatrixError> {
        check_bounds(pos, self.shape())?;
        Ok(if CANONICAL {
            self.coords
                .binary_search(&pos)
                .map_or_else(|_| T::zero(), |k| self.vals[k])
        } else {
            let mut sum = T::zero();
            for (_, &t) in self.iter().filter(|(p, _)| *p == pos) {
                sum += t;
            }
            sum
        })
    }
}

// sorts by position, sums values sharing a position and drops zero sums
pub(crate) fn coalesce<T: NumAssign + Copy>(mut entries: Vec<(Pos, T)>) -> (Vec<Pos>, Vec<T>) {
    entries.sort_by_key(|&(pos, _)| pos);
    let (mut coords, mut vals) = (
        Vec::with_capacity(entries.len()),
        Vec::with_capacity(entries.len()),
    );
    for (pos, group) in &entries.into_iter().group_by(|&(pos, _)| pos) {
        let mut sum = T::zero();
        for (_, t) in group {
            sum += t;
        }
        if !sum.is_zero() {
            coords.push(pos);
            vals.push(sum);
        }
    }
    (coords, vals)
}

pub(crate) fn checked_inclusive_scan(v: &[usize]) -> Vec<usize> {
    std::iter::once(0)
        .chain(v.iter().copied().scan(0usize, |sum, x| {
            *sum = sum
                .checked_add(x)
                .expect("prefix sum overflowed a usize");
            Some(*sum)
        }))
        .collect()
}

fn is_increasing<T: Ord>(s: &[T]) -> bool {
    s.iter().tuple_windows().all(|(a, b)| a < b)
}

#[cfg(feature = "test")]
impl<T: NumAssign + Copy> Coo<T> {
    /// Stores the non-zero entries of `m` in random order, with explicit
    /// zeros mixed in, some of them repeating a position that also holds a
    /// non-zero value.
    pub fn from_dense_shuffled(m: &DenseMatrix<T>, rng: &mut CapRng) -> Self {
        let mut entries = vec![];
        for (pos, &t) in m.iter() {
            if t.is_zero() {
                if rng.gen_bool(0.1) {
                    entries.push((pos, T::zero()));
                }
            } else if rng.gen_bool(0.5) {
                entries.push((pos, t));
                entries.push((pos, T::zero()));
            } else {
                entries.push((pos, t));
            }
        }
        entries.shuffle(rng);
        let (coords, vals) = entries.into_iter().unzip();
        CooMatrix {
            rows: m.rows(),
            cols: m.cols(),
            coords,
            vals,
        }
    }
}

impl<T, const CANONICAL: bool> IntoIterator for CooMatrix<T, CANONICAL> {
    type Item = (Pos, T);

    type IntoIter = std::iter::Zip<vec::IntoIter<Pos>, vec::IntoIter<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.coords.into_iter().zip(self.vals)
    }
}

impl<T> From<CanonicalCoo<T>> for Coo<T> {
    fn from(m: CanonicalCoo<T>) -> Self {
        m.into_uncanonical()
    }
}
