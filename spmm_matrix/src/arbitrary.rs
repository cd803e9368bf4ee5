use arbitrary::{Arbitrary, Unstructured};

use crate::{Matrix, MulPair, Shape};

pub fn arb_fixed_size_matrix<'a, T: Arbitrary<'a>, M: Matrix<T>>(
    u: &mut Unstructured<'a>,
    (rows, cols): Shape,
) -> arbitrary::Result<M> {
    let mut entries = vec![];
    if rows > 0 && cols > 0 {
        for _ in 0..u.int_in_range(0..=1_000.min(rows.saturating_mul(cols).saturating_add(5)))? {
            let i = u.int_in_range(0..=rows - 1)?;
            let j = u.int_in_range(0..=cols - 1)?;
            entries.push(((i, j), u.arbitrary()?));
        }
    }
    M::from_triplets((rows, cols), entries).map_err(|_| arbitrary::Error::IncorrectFormat)
}

pub fn arb_mul_pair_fixed_size<'a, T: Arbitrary<'a>, M: Matrix<T>>(
    u: &mut Unstructured<'a>,
    l: usize,
    m: usize,
    n: usize,
) -> arbitrary::Result<MulPair<M>> {
    let m1 = arb_fixed_size_matrix(u, (l, m))?;
    let m2 = arb_fixed_size_matrix(u, (m, n))?;
    Ok(MulPair(m1, m2))
}
