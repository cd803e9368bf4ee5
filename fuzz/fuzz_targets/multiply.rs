#![no_main]
use std::num::Wrapping;

use cap_rand::{ambient_authority, prelude::CapRng};
use libfuzzer_sys::{arbitrary::Unstructured, fuzz_target};
use spmm_coo::{multiply, par_multiply, Coo};
use spmm_matrix::{arbitrary::arb_mul_pair_fixed_size, Matrix, MulPair};

type T = Wrapping<i32>;

fuzz_target!(|bytes| {
    const MAX_SIZE: usize = 10;

    let mut rng = CapRng::default(ambient_authority());
    let mut u = Unstructured::new(bytes);
    if let (Ok(l), Ok(m), Ok(n)) = (
        u.int_in_range(0..=MAX_SIZE),
        u.int_in_range(0..=MAX_SIZE),
        u.int_in_range(0..=MAX_SIZE),
    ) {
        if let Ok(MulPair(m1, m2)) = arb_mul_pair_fixed_size::<T, Coo<T>>(&mut u, l, m, n) {
            let (d1, d2) = (m1.to_dense(), m2.to_dense());
            let expected = d1.product(&d2).unwrap();
            let m3 = Coo::from_dense_shuffled(&d1, &mut rng);

            let c = multiply(&m1, &m2).unwrap();
            assert_eq!(c.shape(), (l, n));
            let c = c.into_sparse().unwrap();
            assert!(c.invariants(), "{:?}", c);
            assert_eq!(c.to_dense(), expected);

            let c = par_multiply(&m3, &m2).unwrap().into_sparse().unwrap();
            assert!(c.invariants(), "{:?}", c);
            assert_eq!(c.to_dense(), expected);

            assert_eq!(multiply(&m1, &d2).unwrap().into_dense(), expected);
            assert_eq!(par_multiply(&d1, &m2).unwrap().into_dense(), expected);
        }
    }
});
