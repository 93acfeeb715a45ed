use rand::RngCore;
use rand::seq::SliceRandom;

use crate::constants::rng::{SPLITMIX_GAMMA, SPLITMIX_MUL_A, SPLITMIX_MUL_B};
use crate::types::RowIndex;

/// Small deterministic RNG (SplitMix64) used as the default shuffle generator.
///
/// Output depends only on the seed, so partitions are reproducible across
/// platforms and `rand` releases.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    /// Create a generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(SPLITMIX_GAMMA);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX_MUL_A);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX_MUL_B);
        z ^ (z >> 31)
    }
}

impl RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let bytes = self.next_u64_internal().to_le_bytes();
            let copy_len = (dest.len() - offset).min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }
}

/// Permutes each partition's index list in place.
///
/// Only iteration order changes; membership is untouched. Partitions are
/// visited in id order, so one generator state yields one outcome.
pub struct ShuffleStage<'a, R: RngCore + ?Sized> {
    rng: &'a mut R,
}

impl<'a, R: RngCore + ?Sized> ShuffleStage<'a, R> {
    /// Wrap a borrowed generator.
    pub fn new(rng: &'a mut R) -> Self {
        Self { rng }
    }

    /// Shuffle every partition.
    pub fn apply(&mut self, partitions: &mut [Vec<RowIndex>]) {
        for indices in partitions.iter_mut() {
            indices.shuffle(&mut *self.rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = DeterministicRng::new(42);
        let mut b = DeterministicRng::new(42);
        for _ in 0..8 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        assert_ne!(DeterministicRng::new(1).next_u64(), DeterministicRng::new(2).next_u64());
    }

    #[test]
    fn fill_bytes_handles_partial_words() {
        let mut rng = DeterministicRng::new(7);
        let mut buf = [0u8; 11];
        rng.fill_bytes(&mut buf);
        let mut reference = DeterministicRng::new(7);
        let first = reference.next_u64().to_le_bytes();
        assert_eq!(&buf[..8], &first);
        let second = reference.next_u64().to_le_bytes();
        assert_eq!(&buf[8..], &second[..3]);
    }

    #[test]
    fn shuffle_preserves_membership() {
        let mut partitions = vec![(0..20).collect::<Vec<_>>(), (20..25).collect()];
        let mut rng = DeterministicRng::new(42);
        ShuffleStage::new(&mut rng).apply(&mut partitions);
        let mut first = partitions[0].clone();
        first.sort_unstable();
        assert_eq!(first, (0..20).collect::<Vec<_>>());
        let mut second = partitions[1].clone();
        second.sort_unstable();
        assert_eq!(second, (20..25).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_is_reproducible_for_a_seed() {
        let run = |seed| {
            let mut partitions = vec![(0..50).collect::<Vec<_>>()];
            let mut rng = DeterministicRng::new(seed);
            ShuffleStage::new(&mut rng).apply(&mut partitions);
            partitions
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42)[0], (0..50).collect::<Vec<_>>());
    }
}
