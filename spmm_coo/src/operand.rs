use log::debug;
use num_traits::NumAssign;
use spmm_dense::DenseMatrix;
use spmm_matrix::{check_conformable, Matrix, MatrixError, Shape};
use std::borrow::Cow;

use crate::{dense_mul_sparse, par_dense_mul_sparse, CanonicalCoo, Coo};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    Sparse,
    Dense,
}

/// One side of a product. Uncanonical sparse operands are canonicalized
/// after the shapes have been checked.
#[derive(Clone, Copy, Debug)]
pub enum Operand<'a, T> {
    Sparse(&'a Coo<T>),
    Canonical(&'a CanonicalCoo<T>),
    Dense(&'a DenseMatrix<T>),
}

impl<'a, T: NumAssign + Copy> Operand<'a, T> {
    pub fn kind(&self) -> Kind {
        match self {
            Operand::Sparse(_) | Operand::Canonical(_) => Kind::Sparse,
            Operand::Dense(_) => Kind::Dense,
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Operand::Sparse(m) => m.shape(),
            Operand::Canonical(m) => m.shape(),
            Operand::Dense(m) => m.shape(),
        }
    }

    fn resolve(self) -> Resolved<'a, T> {
        match self {
            Operand::Sparse(m) => Resolved::Sparse(Cow::Owned(m.canonicalize())),
            Operand::Canonical(m) => Resolved::Sparse(Cow::Borrowed(m)),
            Operand::Dense(m) => Resolved::Dense(m),
        }
    }
}

impl<'a, T> From<&'a Coo<T>> for Operand<'a, T> {
    fn from(m: &'a Coo<T>) -> Self {
        Operand::Sparse(m)
    }
}

impl<'a, T> From<&'a CanonicalCoo<T>> for Operand<'a, T> {
    fn from(m: &'a CanonicalCoo<T>) -> Self {
        Operand::Canonical(m)
    }
}

impl<'a, T> From<&'a DenseMatrix<T>> for Operand<'a, T> {
    fn from(m: &'a DenseMatrix<T>) -> Self {
        Operand::Dense(m)
    }
}

enum Resolved<'a, T: Clone> {
    Sparse(Cow<'a, CanonicalCoo<T>>),
    Dense(&'a DenseMatrix<T>),
}

/// The result of a product: sparse when both operands are sparse, dense
/// otherwise.
#[derive(Clone, Debug, PartialEq)]
pub enum Product<T> {
    Sparse(CanonicalCoo<T>),
    Dense(DenseMatrix<T>),
}

impl<T: NumAssign + Copy> Product<T> {
    pub fn kind(&self) -> Kind {
        match self {
            Product::Sparse(_) => Kind::Sparse,
            Product::Dense(_) => Kind::Dense,
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Product::Sparse(m) => m.shape(),
            Product::Dense(m) => m.shape(),
        }
    }

    pub fn into_sparse(self) -> Option<CanonicalCoo<T>> {
        match self {
            Product::Sparse(m) => Some(m),
            Product::Dense(_) => None,
        }
    }

    pub fn into_dense(self) -> DenseMatrix<T> {
        match self {
            Product::Sparse(m) => m.to_dense(),
            Product::Dense(m) => m,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MulOptions {
    // run on the rayon thread pool
    pub parallel: bool,
    // number of partitions of the shared indices of a sparse product
    pub threads: usize,
}

impl Default for MulOptions {
    fn default() -> Self {
        MulOptions {
            parallel: false,
            threads: num_cpus::get(),
        }
    }
}

impl MulOptions {
    pub fn parallel() -> Self {
        MulOptions {
            parallel: true,
            ..MulOptions::default()
        }
    }
}

/// Multiplies two matrices, each either sparse or dense. Runs on the
/// calling thread.
pub fn multiply<'a, 'b, T, A, B>(lhs: A, rhs: B) -> Result<Product<T>, MatrixError>
where
    T: NumAssign + Copy + Send + Sync + 'a + 'b,
    A: Into<Operand<'a, T>>,
    B: Into<Operand<'b, T>>,
{
    multiply_with(lhs, rhs, &MulOptions::default())
}

pub fn par_multiply<'a, 'b, T, A, B>(lhs: A, rhs: B) -> Result<Product<T>, MatrixError>
where
    T: NumAssign + Copy + Send + Sync + 'a + 'b,
    A: Into<Operand<'a, T>>,
    B: Into<Operand<'b, T>>,
{
    multiply_with(lhs, rhs, &MulOptions::parallel())
}

pub fn multiply_with<'a, 'b, T, A, B>(
    lhs: A,
    rhs: B,
    options: &MulOptions,
) -> Result<Product<T>, MatrixError>
where
    T: NumAssign + Copy + Send + Sync + 'a + 'b,
    A: Into<Operand<'a, T>>,
    B: Into<Operand<'b, T>>,
{
    let (lhs, rhs) = (lhs.into(), rhs.into());
    check_conformable(lhs.shape(), rhs.shape())?;
    debug!(
        "multiply {:?} {:?} by {:?} {:?}, {:?}",
        lhs.kind(),
        lhs.shape(),
        rhs.kind(),
        rhs.shape(),
        options
    );
    let parallel = options.parallel;
    Ok(match (lhs.resolve(), rhs.resolve()) {
        (Resolved::Sparse(a), Resolved::Sparse(b)) if parallel => {
            Product::Sparse(a.par_mul_merge(&*b, options.threads)?)
        }
        (Resolved::Sparse(a), Resolved::Sparse(b)) => Product::Sparse(a.mul_merge(&*b)?),
        (Resolved::Sparse(a), Resolved::Dense(b)) if parallel => {
            Product::Dense(a.par_mul_dense(b)?)
        }
        (Resolved::Sparse(a), Resolved::Dense(b)) => Product::Dense(a.mul_dense(b)?),
        (Resolved::Dense(a), Resolved::Sparse(b)) if parallel => {
            Product::Dense(par_dense_mul_sparse(a, &*b)?)
        }
        (Resolved::Dense(a), Resolved::Sparse(b)) => Product::Dense(dense_mul_sparse(a, &*b)?),
        (Resolved::Dense(a), Resolved::Dense(b)) => Product::Dense(a.product(b)?),
    })
}
