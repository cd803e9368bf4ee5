use itertools::Itertools;
use log::{debug, trace};
use num_traits::NumAssign;
use rayon::prelude::*;
use spmm_matrix::{check_conformable, Matrix, MatrixError, Pos, Shape};

use crate::{checked_inclusive_scan, coalesce, CanonicalCoo, CooMatrix};

// entries grouped by one of their indices: bucket k holds the (index, value)
// pairs at offsets[k]..offsets[k + 1], in the order they were given
struct Buckets<T> {
    offsets: Vec<usize>,
    indices: Vec<usize>,
    vals: Vec<T>,
}

impl<T: NumAssign + Copy> Buckets<T> {
    // counting sort of (key, index, value) triples on key
    fn new<I>(keys: usize, entries: I) -> Self
    where
        I: Iterator<Item = (usize, usize, T)> + Clone,
    {
        let mut counts = vec![0; keys];
        for (k, _, _) in entries.clone() {
            counts[k] += 1;
        }
        let offsets = checked_inclusive_scan(&counts);
        let mut next = offsets[..keys].to_vec();
        let nnz = offsets[keys];
        let (mut indices, mut vals) = (vec![0; nnz], vec![T::zero(); nnz]);
        for (k, i, t) in entries {
            indices[next[k]] = i;
            vals[next[k]] = t;
            next[k] += 1;
        }
        Buckets {
            offsets,
            indices,
            vals,
        }
    }

    fn len(&self, k: usize) -> usize {
        self.offsets[k + 1] - self.offsets[k]
    }

    fn bucket(&self, k: usize) -> (&[usize], &[T]) {
        let (lo, hi) = (self.offsets[k], self.offsets[k + 1]);
        (&self.indices[lo..hi], &self.vals[lo..hi])
    }
}

// the operands of a sparse product, joined on the shared dimension
struct Join<T> {
    // lhs column t -> (row, value)
    lhs: Buckets<T>,
    // rhs row t -> (col, value)
    rhs: Buckets<T>,
    // values of t with entries on both sides, ascending
    shared: Vec<usize>,
}

impl<T: NumAssign + Copy> Join<T> {
    fn new(lhs: &CanonicalCoo<T>, rhs: &CanonicalCoo<T>) -> Self {
        let inner = lhs.cols();
        let lhs = Buckets::new(inner, lhs.iter().map(|((i, t), &a)| (t, i, a)));
        let rhs = Buckets::new(inner, rhs.iter().map(|((t, j), &b)| (t, j, b)));
        let shared = (0..inner)
            .filter(|&t| lhs.len(t) > 0 && rhs.len(t) > 0)
            .collect();
        Join { lhs, rhs, shared }
    }

    // number of scalar products contributed by each shared index
    fn products(&self) -> Vec<usize> {
        self.shared
            .iter()
            .map(|&t| {
                self.lhs
                    .len(t)
                    .checked_mul(self.rhs.len(t))
                    .expect("product count overflowed a usize")
            })
            .collect()
    }

    fn accumulate(&self, shared: &[usize], capacity: usize) -> linprobe::HashMap<Pos, T> {
        let mut acc = linprobe::HashMap::with_capacity(capacity);
        for &t in shared {
            let (rows, lvals) = self.lhs.bucket(t);
            let (cols, rvals) = self.rhs.bucket(t);
            for (&i, &a) in rows.iter().zip(lvals) {
                for (&j, &b) in cols.iter().zip(rvals) {
                    let t1 = a * b;
                    // contributions from different t meet here and must add up
                    acc.entry((i, j))
                        .and_modify(|v| {
                            *v += t1;
                        })
                        .or_insert(t1);
                }
            }
        }
        #[cfg(feature = "debug")]
        debug!("accumulator probe lengths {:?}", acc.probe_lengths);
        acc
    }
}

// splits `work` into `parts` contiguous ranges of roughly equal total,
// returned as offsets into `work`
fn partition(work: &[usize], parts: usize) -> Vec<usize> {
    let ps_work = checked_inclusive_scan(work);
    let total = ps_work.last().copied().unwrap_or(0);
    let parts = parts.max(1);
    let average = total.div_ceil(parts);
    let mut offsets = vec![0];
    offsets.extend(
        (1..parts).map(|tid| ps_work.partition_point(|&x| x <= average.saturating_mul(tid)) - 1),
    );
    offsets.push(work.len());
    offsets
}

// there is at most one output per position and one per scalar product. the
// accumulator grows past the input size only when the output needs it
fn capacity_hint((rows, cols): Shape, products: usize, inputs: usize) -> usize {
    rows.saturating_mul(cols).min(products).min(inputs)
}

impl<T: NumAssign + Copy + Send + Sync> CanonicalCoo<T> {
    /// Sparse product by merge-joining the columns of `self` with the rows
    /// of `rhs`.
    ///
    /// Floating point results may differ from a dense product in the last
    /// bits, since the order of summation differs.
    pub fn mul_merge(&self, rhs: &CanonicalCoo<T>) -> Result<CanonicalCoo<T>, MatrixError> {
        let shape = check_conformable(self.shape(), rhs.shape())?;
        if self.nnz() == 0 || rhs.nnz() == 0 {
            return Ok(CooMatrix::new(shape));
        }
        let join = Join::new(self, rhs);
        let products: usize = join.products().iter().sum();
        debug!(
            "mul_merge: {} shared indices, {} products",
            join.shared.len(),
            products
        );
        let capacity = capacity_hint(shape, products, self.nnz() + rhs.nnz());
        let mut acc = join.accumulate(&join.shared, capacity);
        let (coords, vals) = coalesce(acc.drain().collect());
        Ok(CooMatrix {
            rows: shape.0,
            cols: shape.1,
            coords,
            vals,
        })
    }

    /// Like [`CanonicalCoo::mul_merge`], with the shared indices split
    /// across `threads` rayon tasks. Each task sums into its own accumulator
    /// and the partial sums are added together at the end.
    pub fn par_mul_merge(
        &self,
        rhs: &CanonicalCoo<T>,
        threads: usize,
    ) -> Result<CanonicalCoo<T>, MatrixError> {
        let shape = check_conformable(self.shape(), rhs.shape())?;
        if self.nnz() == 0 || rhs.nnz() == 0 {
            return Ok(CooMatrix::new(shape));
        }
        let join = Join::new(self, rhs);
        let products = join.products();
        let offsets = partition(&products, threads);
        let inputs = self.nnz() + rhs.nnz();
        debug!(
            "par_mul_merge: {} shared indices over {} tasks",
            join.shared.len(),
            offsets.len() - 1
        );
        let partials: Vec<Vec<(Pos, T)>> = offsets
            .iter()
            .copied()
            .tuple_windows()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(tlo, thi)| {
                let work: usize = products[tlo..thi].iter().sum();
                trace!("task over shared[{}..{}], {} products", tlo, thi, work);
                let capacity = capacity_hint(shape, work, inputs);
                let mut acc = join.accumulate(&join.shared[tlo..thi], capacity);
                acc.drain().collect()
            })
            .collect();
        let (coords, vals) = coalesce(partials.into_iter().flatten().collect());
        Ok(CooMatrix {
            rows: shape.0,
            cols: shape.1,
            coords,
            vals,
        })
    }
}

#[test]
fn test_partition() {
    use proptest::{collection::vec, prelude::*, test_runner::TestRunner};

    let mut runner = TestRunner::default();
    runner
        .run(&(vec(0..100usize, 0..50), 1..10usize), |(work, parts)| {
            let offsets = partition(&work, parts);
            prop_assert_eq!(offsets.len(), parts + 1);
            prop_assert_eq!(offsets[0], 0);
            prop_assert_eq!(*offsets.last().unwrap(), work.len());
            prop_assert!(
                offsets.iter().tuple_windows().all(|(a, b)| a <= b),
                "{:?}",
                offsets
            );
            Ok(())
        })
        .unwrap();
}
