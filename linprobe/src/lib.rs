#![deny(clippy::disallowed_methods)]

use std::hash::Hasher;

mod map;

pub use map::{Drain, Entry, HashMap, VacantEntry};

const HASH_SCAL: u64 = 0x9e37_79b9_7f4a_7c15;
const MIN_TABLE_SIZE: usize = 16;

// multiplicative hashing, good enough for the small integer keys of sparse indices
#[derive(Clone, Copy, Debug, Default)]
pub struct MulHasher(u64);

impl Hasher for MulHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0 ^ (self.0 >> 29)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 ^ u64::from(b)).wrapping_mul(HASH_SCAL);
        }
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.write_u64(u64::from(i));
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = (self.0.rotate_left(5) ^ i).wrapping_mul(HASH_SCAL);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        // usize is at most 64 bits on every supported target
        self.write_u64(i as u64);
    }
}

// slot count for a table holding `capacity` items at load factor <= 1/2
fn table_size(capacity: usize) -> usize {
    capacity
        .checked_next_power_of_two()
        .expect("next power of 2 doesn't fit a usize")
        .checked_mul(2)
        .expect("multiplication by 2 overflows a usize")
        .max(MIN_TABLE_SIZE)
}
