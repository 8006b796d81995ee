//! 32-bit xorshift shared by both sequencers

use crate::DEFAULT_SEED;
use tinyrand::{Rand, Seeded};

/// `x ^= x << 13; x ^= x >> 17; x ^= x << 5` over one word.
///
/// A zero state would yield zero forever, so [`Xorshift32::new`] swaps a zero
/// seed for [`DEFAULT_SEED`]. Any other state stays non-zero.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    pub const fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { DEFAULT_SEED } else { seed },
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

impl Default for Xorshift32 {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

/// zero-extended, so `next_u64() % n` picks the same as `next() % n`
impl Rand for Xorshift32 {
    fn next_u64(&mut self) -> u64 {
        self.next() as u64
    }
}

impl Seeded for Xorshift32 {
    type R = Self;

    fn seed(seed: u64) -> Self::R {
        Self::new(seed as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_seed_sequence() {
        let mut rand = Xorshift32::default();
        let words: [u32; 6] = core::array::from_fn(|_| rand.next());
        assert_eq!(
            words,
            [1892583, 470389255, 3882205507, 3069989445, 2854842367, 2098155156]
        );
    }

    #[test]
    fn reproducible() {
        let mut a = Xorshift32::new(0xdead_beef);
        let mut b = Xorshift32::new(0xdead_beef);
        for _ in 0..1000 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn never_zero() {
        let mut rand = Xorshift32::default();
        for _ in 0..100_000 {
            assert_ne!(rand.next(), 0);
        }
    }

    #[test]
    fn zero_seed_falls_back() {
        assert_eq!(Xorshift32::new(0), Xorshift32::default());
        assert_eq!(Xorshift32::seed(1 << 32), Xorshift32::default());
    }

    #[test]
    fn rand_matches_words() {
        let mut words = Xorshift32::default();
        let mut rand = Xorshift32::default();
        for _ in 0..64 {
            assert_eq!(rand.next_u64(), words.next() as u64);
        }
    }
}
