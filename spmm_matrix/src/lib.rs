#![deny(clippy::disallowed_methods)]

use thiserror::Error;

#[cfg(feature = "arbitrary")]
pub mod arbitrary;
#[cfg(feature = "proptest")]
pub mod proptest;

/// (row, col) position of an entry.
pub type Pos = (usize, usize);
/// (rows, cols) of a matrix.
pub type Shape = (usize, usize);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("entry {pos:?} is out of bounds for a matrix of shape {shape:?}")]
    OutOfBounds { pos: Pos, shape: Shape },
    #[error("cannot multiply a {lhs:?} matrix by a {rhs:?} matrix")]
    ShapeMismatch { lhs: Shape, rhs: Shape },
    #[error("{coords} coordinates given for {vals} values")]
    LengthMismatch { coords: usize, vals: usize },
}

pub trait Matrix<T>: Sized {
    fn invariants(&self) -> bool;
    // matrix with no explicit entries
    fn new(shape: Shape) -> Self;
    fn identity(n: usize) -> Self;
    // duplicate positions sum
    fn from_triplets(shape: Shape, entries: Vec<(Pos, T)>) -> Result<Self, MatrixError>;
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn shape(&self) -> Shape {
        (self.rows(), self.cols())
    }
    // the number of explicit entries in the matrix
    fn nnz(&self) -> usize;
    // the logical value at pos, zero if nothing is stored there
    fn get_element(&self, pos: Pos) -> Result<T, MatrixError>;
}

pub fn check_bounds(pos: Pos, shape: Shape) -> Result<(), MatrixError> {
    if pos.0 < shape.0 && pos.1 < shape.1 {
        Ok(())
    } else {
        Err(MatrixError::OutOfBounds { pos, shape })
    }
}

/// Checks that `lhs * rhs` is defined and returns the shape of the product.
pub fn check_conformable(lhs: Shape, rhs: Shape) -> Result<Shape, MatrixError> {
    if lhs.1 == rhs.0 {
        Ok((lhs.0, rhs.1))
    } else {
        Err(MatrixError::ShapeMismatch { lhs, rhs })
    }
}

// pair of matrices conformable for multiplication
#[derive(Clone, Debug)]
pub struct MulPair<M>(pub M, pub M);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert_eq!(check_bounds((1, 2), (2, 3)), Ok(()));
        assert_eq!(
            check_bounds((2, 0), (2, 3)),
            Err(MatrixError::OutOfBounds {
                pos: (2, 0),
                shape: (2, 3)
            })
        );
        assert!(check_bounds((0, 0), (0, 0)).is_err());
    }

    #[test]
    fn conformable() {
        assert_eq!(check_conformable((2, 3), (3, 4)), Ok((2, 4)));
        assert_eq!(check_conformable((0, 0), (0, 5)), Ok((0, 5)));
        assert_eq!(
            check_conformable((2, 3), (2, 3)),
            Err(MatrixError::ShapeMismatch {
                lhs: (2, 3),
                rhs: (2, 3)
            })
        );
    }
}
