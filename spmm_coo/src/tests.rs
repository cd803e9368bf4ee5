#![allow(clippy::disallowed_methods)]
use std::{fmt::Debug, num::Wrapping};

use cap_rand::{
    ambient_authority,
    prelude::{CapRng, Rng},
};
use num_traits::NumAssign;
use proptest::{prelude::*, test_runner::TestRunner};
use spmm_dense::DenseMatrix;
use spmm_matrix::{
    proptest::{arb_matrix, arb_mul_pair},
    Matrix, MatrixError, MulPair,
};

use crate::{
    dense_mul_sparse, multiply, multiply_with, par_multiply, CanonicalCoo, Coo, CooMatrix, Kind,
    MulOptions, Operand, Product,
};

const MAX_SIZE: usize = 10;

type W = Wrapping<i8>;

fn test_invariants<S, F, T, const B: bool>(strategy: &S, f: F)
where
    S: Strategy,
    T: NumAssign + Copy + Debug,
    F: Fn(S::Value) -> CooMatrix<T, B>,
{
    let mut runner = TestRunner::default();
    runner
        .run(strategy, |v| {
            let m = f(v);
            prop_assert!(m.invariants(), "{:?}", m);
            Ok(())
        })
        .unwrap();
}

// checks that a product of sparse operands agrees with the dense reference
fn test_against_reference<F>(f: F)
where
    F: Fn(&Coo<W>, &Coo<W>) -> Result<Product<W>, MatrixError>,
{
    let mut runner = TestRunner::default();
    runner
        .run(
            &arb_mul_pair::<W, Coo<W>, _, _>(any::<W>),
            |MulPair(m1, m2)| {
                let expected = m1.to_dense().product(&m2.to_dense()).unwrap();
                let actual = f(&m1, &m2).unwrap();
                if let Product::Sparse(m) = &actual {
                    prop_assert!(m.invariants(), "{:?}", m);
                }
                prop_assert_eq!(actual.into_dense(), expected);
                Ok(())
            },
        )
        .unwrap();
}

fn random_dense(rng: &mut CapRng, (rows, cols): (usize, usize), density: f64) -> DenseMatrix<f64> {
    let data = (0..rows * cols)
        .map(|_| {
            if rng.gen_bool(density) {
                rng.gen_range(-10.0..10.0)
            } else {
                0.0
            }
        })
        .collect();
    DenseMatrix::from_row_major((rows, cols), data).unwrap()
}

// base cases
#[test]
fn new_invariants() {
    test_invariants(&(0..MAX_SIZE, 0..MAX_SIZE), Coo::<i8>::new);
    test_invariants(&(0..MAX_SIZE, 0..MAX_SIZE), CanonicalCoo::<i8>::new);
}

#[test]
fn identity_invariants() {
    test_invariants(&(0..MAX_SIZE), Coo::<i8>::identity);
    test_invariants(&(0..MAX_SIZE), CanonicalCoo::<i8>::identity);
}

#[test]
fn arb_invariants() {
    test_invariants(&arb_matrix::<W, Coo<W>, _, _>(any::<W>), |m| m);
    test_invariants(&arb_matrix::<W, CanonicalCoo<W>, _, _>(any::<W>), |m| m);
}

#[test]
fn from_triplets() {
    let m = Coo::from_triplets((2, 3), vec![(1, 2), (0, 0), (1, 2)], vec![1, 2, 3]).unwrap();
    assert!(m.invariants());
    assert_eq!(m.nnz(), 3);
    assert_eq!(m.get_element((1, 2)), Ok(4));
    assert_eq!(m.get_element((0, 1)), Ok(0));
    assert_eq!(m.density(), 0.5);
    assert_eq!(
        Coo::from_triplets((2, 3), vec![(0, 3)], vec![1]),
        Err(MatrixError::OutOfBounds {
            pos: (0, 3),
            shape: (2, 3)
        })
    );
    assert_eq!(
        Coo::from_triplets((2, 3), vec![(0, 0), (1, 1)], vec![1]),
        Err(MatrixError::LengthMismatch { coords: 2, vals: 1 })
    );
    assert!(Coo::<i32>::from_triplets((0, 0), vec![(0, 0)], vec![1]).is_err());
}

// inductive cases
#[test]
fn canonicalize() {
    test_invariants(&arb_matrix::<W, Coo<W>, _, _>(any::<W>), |m| m.canonicalize());

    let mut runner = TestRunner::default();
    runner
        .run(&arb_matrix::<W, Coo<W>, _, _>(any::<W>), |m| {
            let m1 = m.canonicalize();
            prop_assert_eq!(m1.to_dense(), m.to_dense());
            prop_assert_eq!(m1.canonicalize(), m1.clone());
            prop_assert_eq!(m1.clone().into_uncanonical().into_canonical(), m1);
            Ok(())
        })
        .unwrap();
}

#[test]
fn canonicalize_drops_cancelling_entries() {
    let m = Coo::from_triplets(
        (2, 2),
        vec![(1, 1), (0, 1), (1, 1), (0, 0), (0, 1)],
        vec![4, 3, -4, 0, 2],
    )
    .unwrap();
    let m = m.canonicalize();
    assert_eq!(m.coords(), &[(0, 1)]);
    assert_eq!(m.vals(), &[5]);
}

#[test]
fn from_dense_shuffled() {
    let mut runner = TestRunner::default();
    runner
        .run(&DenseMatrix::<W>::arb_matrix(), |m| {
            let mut rng = CapRng::default(ambient_authority());
            let m1 = Coo::from_dense_shuffled(&m, &mut rng);
            prop_assert!(m1.invariants());
            prop_assert!(m1.iter().all(|(pos, &t)| t == Wrapping(0) || t == m[pos]));
            prop_assert_eq!(m1.to_dense(), m.clone());
            prop_assert_eq!(m1.canonicalize(), CanonicalCoo::from_dense(&m));
            Ok(())
        })
        .unwrap();
}

#[test]
fn transpose() {
    test_invariants(&arb_matrix::<W, Coo<W>, _, _>(any::<W>), |m| m.transpose());
    test_invariants(&arb_matrix::<W, CanonicalCoo<W>, _, _>(any::<W>), |m| m.transpose());
}

#[test]
fn mul_sparse_sparse() {
    test_against_reference(|m1, m2| multiply(m1, m2));
}

#[test]
fn mul_sparse_sparse_canonical() {
    test_against_reference(|m1, m2| multiply(&m1.canonicalize(), &m2.canonicalize()));
}

#[test]
fn par_mul_sparse_sparse() {
    for threads in [1, 2, 3, 8] {
        test_against_reference(|m1, m2| {
            multiply_with(
                m1,
                m2,
                &MulOptions {
                    parallel: true,
                    threads,
                },
            )
        });
    }
}

#[test]
fn mul_sparse_dense() {
    test_against_reference(|m1, m2| multiply(m1, &m2.to_dense()));
    test_against_reference(|m1, m2| par_multiply(m1, &m2.to_dense()));
}

#[test]
fn mul_dense_sparse() {
    test_against_reference(|m1, m2| multiply(&m1.to_dense(), m2));
    test_against_reference(|m1, m2| par_multiply(&m1.to_dense(), m2));
}

#[test]
fn mul_dense_dense() {
    test_against_reference(|m1, m2| multiply(&m1.to_dense(), &m2.to_dense()));
}

#[test]
fn mul_kinds() {
    let a = Coo::<i32>::identity(2);
    let d = DenseMatrix::<i32>::identity(2);
    assert_eq!(multiply(&a, &a).unwrap().kind(), Kind::Sparse);
    assert_eq!(multiply(&a, &d).unwrap().kind(), Kind::Dense);
    assert_eq!(multiply(&d, &a).unwrap().kind(), Kind::Dense);
    assert_eq!(multiply(&d, &d).unwrap().kind(), Kind::Dense);
    assert_eq!(Operand::from(&a).kind(), Kind::Sparse);
    assert_eq!(Operand::from(&d).kind(), Kind::Dense);
}

#[test]
fn mul_float() {
    let mut runner = TestRunner::default();
    runner
        .run(
            &arb_mul_pair::<f64, Coo<f64>, _, _>(|| -1e3..1e3f64),
            |MulPair(m1, m2)| {
                let (d1, d2) = (m1.to_dense(), m2.to_dense());
                for approx in [
                    multiply(&m1, &m2).unwrap().into_dense(),
                    par_multiply(&m1, &m2).unwrap().into_dense(),
                    multiply(&m1, &d2).unwrap().into_dense(),
                    multiply(&d1, &m2).unwrap().into_dense(),
                ] {
                    prop_assert!(
                        d1.good_matrix_approx(&d2, &approx).unwrap(),
                        "{}",
                        approx.debug_in_scientific_notation()
                    );
                }
                Ok(())
            },
        )
        .unwrap();
}

#[test]
fn random_matches_dense_reference() {
    let mut rng = CapRng::default(ambient_authority());
    for _ in 0..200 {
        let d1 = random_dense(&mut rng, (4, 4), 0.3);
        let d2 = random_dense(&mut rng, (4, 4), 0.3);
        let m1 = Coo::from_dense_shuffled(&d1, &mut rng);
        let m2 = Coo::from_dense_shuffled(&d2, &mut rng);
        let approx = multiply(&m1, &m2).unwrap().into_dense();
        assert!(
            d1.good_matrix_approx(&d2, &approx).unwrap(),
            "{} * {} != {}",
            d1.debug_in_scientific_notation(),
            d2.debug_in_scientific_notation(),
            approx.debug_in_scientific_notation()
        );
    }
}

#[test]
fn uneven_shapes_and_thread_counts() {
    let mut rng = CapRng::default(ambient_authority());
    for (l, n, p) in [(60, 200, 50), (1, 500, 1), (300, 3, 300)] {
        let mut random = |shape: (usize, usize)| {
            let data = (0..shape.0 * shape.1)
                .map(|_| {
                    if rng.gen_bool(0.1) {
                        Wrapping(rng.gen_range(-1000..1000i64))
                    } else {
                        Wrapping(0)
                    }
                })
                .collect();
            DenseMatrix::from_row_major(shape, data).unwrap()
        };
        let (d1, d2) = (random((l, n)), random((n, p)));
        let expected = d1.product(&d2).unwrap();
        let m1 = Coo::from_dense_shuffled(&d1, &mut rng);
        let m2 = Coo::from_dense_shuffled(&d2, &mut rng);
        for threads in [0, 1, 7, 64] {
            let options = MulOptions {
                parallel: true,
                threads,
            };
            let c = multiply_with(&m1, &m2, &options).unwrap().into_sparse().unwrap();
            assert!(c.invariants());
            assert_eq!(c.to_dense(), expected);
            assert_eq!(multiply_with(&m1, &d2, &options).unwrap().into_dense(), expected);
            assert_eq!(multiply_with(&d1, &m2, &options).unwrap().into_dense(), expected);
        }
        assert_eq!(multiply(&m1, &m2).unwrap().into_dense(), expected);
        assert_eq!(multiply(&m1, &d2).unwrap().into_dense(), expected);
        assert_eq!(multiply(&d1, &m2).unwrap().into_dense(), expected);
    }
}

#[test]
fn shape_mismatch() {
    let a = Coo::<i32>::new((2, 3));
    let d = DenseMatrix::<i32>::zeros((2, 3));
    let err = MatrixError::ShapeMismatch {
        lhs: (2, 3),
        rhs: (2, 3),
    };
    assert_eq!(multiply(&a, &a).unwrap_err(), err);
    assert_eq!(multiply(&a, &d).unwrap_err(), err);
    assert_eq!(multiply(&d, &a).unwrap_err(), err);
    assert_eq!(multiply(&d, &d).unwrap_err(), err);
    assert_eq!(par_multiply(&a, &a).unwrap_err(), err);
    assert_eq!(par_multiply(&d, &a).unwrap_err(), err);
    let c = a.canonicalize();
    assert_eq!(c.mul_merge(&c).unwrap_err(), err);
    assert_eq!(c.par_mul_merge(&c, 4).unwrap_err(), err);
    assert_eq!(c.mul_dense(&d).unwrap_err(), err);
    assert_eq!(dense_mul_sparse(&d, &c).unwrap_err(), err);
}

#[test]
fn shape_law() {
    let mut runner = TestRunner::default();
    runner
        .run(
            &arb_mul_pair::<W, Coo<W>, _, _>(any::<W>),
            |MulPair(m1, m2)| {
                let shape = (m1.rows(), m2.cols());
                prop_assert_eq!(multiply(&m1, &m2).unwrap().shape(), shape);
                prop_assert_eq!(multiply(&m1, &m2.to_dense()).unwrap().shape(), shape);
                Ok(())
            },
        )
        .unwrap();
}

#[test]
fn zero_preservation() {
    let mut runner = TestRunner::default();
    runner
        .run(&arb_matrix::<W, Coo<W>, _, _>(any::<W>), |m| {
            let (rows, cols) = m.shape();
            let zero = Coo::<W>::new((cols, 3));
            let c = multiply(&m, &zero).unwrap().into_sparse().unwrap();
            prop_assert_eq!(c.shape(), (rows, 3));
            prop_assert_eq!(c.nnz(), 0);
            let c = multiply(&DenseMatrix::<W>::zeros((2, rows)), &m).unwrap().into_dense();
            prop_assert_eq!(c.shape(), (2, cols));
            prop_assert!(c.is_zero());
            Ok(())
        })
        .unwrap();
}

#[test]
fn identity_law() {
    let mut runner = TestRunner::default();
    runner
        .run(&arb_matrix::<W, Coo<W>, _, _>(any::<W>), |m| {
            let (rows, cols) = m.shape();
            let expected = Product::Sparse(m.canonicalize());
            prop_assert_eq!(
                multiply(&m, &CanonicalCoo::<W>::identity(cols)).unwrap(),
                expected.clone()
            );
            prop_assert_eq!(multiply(&Coo::<W>::identity(rows), &m).unwrap(), expected);
            Ok(())
        })
        .unwrap();
}

#[test]
fn transpose_law() {
    let mut runner = TestRunner::default();
    runner
        .run(
            &arb_mul_pair::<W, CanonicalCoo<W>, _, _>(any::<W>),
            |MulPair(m1, m2)| {
                let c = m1.mul_merge(&m2).unwrap();
                prop_assert_eq!(c.transpose(), m2.transpose().mul_merge(&m1.transpose()).unwrap());
                Ok(())
            },
        )
        .unwrap();
}

#[test]
fn duplicate_coordinates() {
    let split = Coo::from_triplets((2, 2), vec![(0, 1), (1, 0), (0, 1)], vec![2, 7, 3]).unwrap();
    let merged = Coo::from_triplets((2, 2), vec![(0, 1), (1, 0)], vec![5, 7]).unwrap();
    let b = Coo::from_triplets((2, 2), vec![(1, 1), (0, 0), (1, 0)], vec![1, 2, 3]).unwrap();
    let d = b.to_dense();
    assert_eq!(multiply(&split, &b), multiply(&merged, &b));
    assert_eq!(multiply(&b, &split), multiply(&b, &merged));
    assert_eq!(multiply(&split, &d), multiply(&merged, &d));
    assert_eq!(multiply(&d, &split), multiply(&d, &merged));
    assert_eq!(multiply(&split, &split), multiply(&merged, &merged));
}

#[test]
fn contributions_from_different_shared_indices_add_up() {
    // C[0,0] = 2*1 + 3*5 draws on t = 0 and t = 1
    let a = Coo::from_triplets((2, 2), vec![(0, 0), (0, 1), (1, 1)], vec![2, 3, 4]).unwrap();
    let b = Coo::from_triplets((2, 2), vec![(0, 0), (1, 0), (1, 1)], vec![1, 5, 2]).unwrap();
    for c in [multiply(&a, &b), par_multiply(&a, &b)] {
        let c = c.unwrap().into_sparse().unwrap();
        assert_eq!(c.shape(), (2, 2));
        assert_eq!(c.coords(), &[(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(c.vals(), &[17, 6, 20, 8]);
    }
}

#[test]
fn empty_operand() {
    let a = Coo::<i64>::new((3, 4));
    let b = Coo::from_triplets((4, 2), vec![(0, 0), (3, 1)], vec![1, 2]).unwrap();
    let c = multiply(&a, &b).unwrap().into_sparse().unwrap();
    assert_eq!(c.shape(), (3, 2));
    assert_eq!(c.nnz(), 0);
    let c = multiply(&b.transpose(), &a.transpose()).unwrap().into_sparse().unwrap();
    assert_eq!(c.shape(), (2, 3));
    assert_eq!(c.nnz(), 0);
    let c = multiply(&a, &b.to_dense()).unwrap().into_dense();
    assert_eq!(c, DenseMatrix::zeros((3, 2)));
}

#[test]
fn zero_sized_shapes() {
    let a = Coo::<i64>::new((0, 3));
    let b = Coo::<i64>::identity(3);
    assert_eq!(multiply(&a, &b).unwrap().shape(), (0, 3));
    let a = Coo::<i64>::new((2, 0));
    let b = Coo::<i64>::new((0, 3));
    assert_eq!(multiply(&a, &b).unwrap().into_sparse().unwrap().nnz(), 0);
    assert_eq!(
        multiply(&a, &b.to_dense()).unwrap().into_dense(),
        DenseMatrix::zeros((2, 3))
    );
    assert_eq!(
        par_multiply(&a.to_dense(), &b).unwrap().into_dense(),
        DenseMatrix::zeros((2, 3))
    );
    assert_eq!(a.density(), 0.0);
}

#[test]
fn shared_operands_across_threads() {
    let a = CanonicalCoo::from_dense(
        &DenseMatrix::from_row_major((2, 3), vec![1, 0, 2, 0, 3, 0]).unwrap(),
    );
    let b = a.transpose();
    let expected = multiply(&a, &b).unwrap();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| multiply(&a, &b).unwrap())).collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    });
}
