use crate::{bytes_to_int64, Hash256, MAX_LIST_SIZE};
use ethereum_hashing::hash_fixed;
use std::cmp::max;

const SEED_SIZE: usize = 32;

/// Return `p(index)` in a pseudorandom permutation `p` of `0...list_size-1` with `seed` as
/// entropy.
///
/// Returns `None` if `index >= list_size`, `list_size == 0` or `list_size > MAX_LIST_SIZE`.
pub fn compute_shuffled_index(
    index: usize,
    list_size: usize,
    seed: &[u8],
    shuffle_round_count: u8,
) -> Option<usize> {
    if list_size == 0 || index >= list_size || list_size > MAX_LIST_SIZE || seed.len() != SEED_SIZE
    {
        return None;
    }

    let mut index = index;
    for round in 0..shuffle_round_count {
        let pivot = bytes_to_int64(pivot_hash(seed, round).as_bytes()) as usize % list_size;
        index = do_round(seed, index, pivot, round, list_size);
    }
    Some(index)
}

fn do_round(seed: &[u8], index: usize, pivot: usize, round: u8, list_size: usize) -> usize {
    let flip = (pivot + (list_size - index)) % list_size;
    let position = max(index, flip);
    let source = source_hash(seed, round, position);
    let byte = source[(position % 256) / 8];
    let bit = (byte >> (position % 8)) % 2;
    if bit == 1 {
        flip
    } else {
        index
    }
}

fn pivot_hash(seed: &[u8], round: u8) -> Hash256 {
    let mut preimage = [0; SEED_SIZE + 1];
    preimage[..SEED_SIZE].copy_from_slice(seed);
    preimage[SEED_SIZE] = round;
    Hash256::from(hash_fixed(&preimage))
}

fn source_hash(seed: &[u8], round: u8, position: usize) -> [u8; 32] {
    let mut preimage = [0; SEED_SIZE + 5];
    preimage[..SEED_SIZE].copy_from_slice(seed);
    preimage[SEED_SIZE] = round;
    preimage[SEED_SIZE + 1..].copy_from_slice(&((position / 256) as u32).to_le_bytes());
    hash_fixed(&preimage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    const ROUNDS: u8 = 90;

    fn seed(byte: u8) -> Vec<u8> {
        vec![byte; SEED_SIZE]
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(compute_shuffled_index(0, 0, &seed(1), ROUNDS), None);
        assert_eq!(compute_shuffled_index(5, 5, &seed(1), ROUNDS), None);
        assert_eq!(
            compute_shuffled_index(0, MAX_LIST_SIZE + 1, &seed(1), ROUNDS),
            None
        );
    }

    #[test]
    fn rejects_short_seed() {
        assert_eq!(compute_shuffled_index(0, 10, &[1, 2, 3], ROUNDS), None);
    }

    #[test]
    fn zero_rounds_is_identity() {
        for i in 0..32 {
            assert_eq!(compute_shuffled_index(i, 32, &seed(9), 0), Some(i));
        }
    }

    #[test]
    fn single_element_list() {
        assert_eq!(compute_shuffled_index(0, 1, &seed(3), ROUNDS), Some(0));
    }

    #[test]
    fn deterministic() {
        let a: Vec<_> = (0..100)
            .map(|i| compute_shuffled_index(i, 100, &seed(7), ROUNDS))
            .collect();
        let b: Vec<_> = (0..100)
            .map(|i| compute_shuffled_index(i, 100, &seed(7), ROUNDS))
            .collect();
        assert_eq!(a, b);
    }

    #[quickcheck]
    fn is_a_bijection(list_size: u16, seed_byte: u8, rounds: u8) -> TestResult {
        let list_size = list_size as usize % 600;
        if list_size == 0 {
            return TestResult::discard();
        }
        let rounds = rounds % 20;

        let mut seen = vec![false; list_size];
        for i in 0..list_size {
            match compute_shuffled_index(i, list_size, &seed(seed_byte), rounds) {
                Some(j) if j < list_size && !seen[j] => seen[j] = true,
                _ => return TestResult::failed(),
            }
        }
        TestResult::from_bool(seen.iter().all(|s| *s))
    }
}
