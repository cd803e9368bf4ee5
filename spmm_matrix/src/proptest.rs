use proptest::prelude::*;

use crate::{Matrix, MulPair, Pos, Shape};

const MAX_SIZE: usize = 5;

/// Triplets for a matrix of the given shape, possibly with repeated positions.
pub fn arb_triplets<S: Strategy>(
    (rows, cols): Shape,
    element: S,
) -> impl Strategy<Value = Vec<(Pos, S::Value)>> {
    debug_assert!(rows > 0 && cols > 0);
    proptest::collection::vec(((0..rows, 0..cols), element), 0..=(2 * rows * cols))
}

// `element` builds the strategy for a single entry, e.g. `any::<i8>`
pub fn arb_fixed_size_matrix<T, M, S, E>(shape: Shape, element: E) -> impl Strategy<Value = M>
where
    M: Matrix<T> + std::fmt::Debug,
    S: Strategy<Value = T>,
    E: Fn() -> S,
{
    arb_triplets(shape, element()).prop_map(move |entries| {
        M::from_triplets(shape, entries).expect("generated positions are in bounds")
    })
}

pub fn arb_matrix<T, M, S, E>(element: E) -> impl Strategy<Value = M>
where
    M: Matrix<T> + std::fmt::Debug,
    S: Strategy<Value = T>,
    E: Fn() -> S + Copy,
{
    (1..MAX_SIZE, 1..MAX_SIZE).prop_flat_map(move |shape| arb_fixed_size_matrix(shape, element))
}

pub fn arb_mul_pair_fixed_size<T, M, S, E>(
    l: usize,
    n: usize,
    p: usize,
    element: E,
) -> impl Strategy<Value = MulPair<M>>
where
    M: Matrix<T> + std::fmt::Debug,
    S: Strategy<Value = T>,
    E: Fn() -> S + Copy,
{
    (
        arb_fixed_size_matrix((l, n), element),
        arb_fixed_size_matrix((n, p), element),
    )
        .prop_map(|(m1, m2)| MulPair(m1, m2))
}

pub fn arb_mul_pair<T, M, S, E>(element: E) -> impl Strategy<Value = MulPair<M>>
where
    M: Matrix<T> + std::fmt::Debug,
    S: Strategy<Value = T>,
    E: Fn() -> S + Copy,
{
    (1..MAX_SIZE, 1..MAX_SIZE, 1..MAX_SIZE)
        .prop_flat_map(move |(l, n, p)| arb_mul_pair_fixed_size(l, n, p, element))
}
