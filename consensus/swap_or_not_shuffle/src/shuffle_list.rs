use crate::{bytes_to_int64, MAX_LIST_SIZE};
use ethereum_hashing::hash_fixed;

const SEED_SIZE: usize = 32;
const ROUND_SIZE: usize = 1;
const POSITION_WINDOW_SIZE: usize = 4;
const PIVOT_VIEW_SIZE: usize = SEED_SIZE + ROUND_SIZE;
const TOTAL_SIZE: usize = SEED_SIZE + ROUND_SIZE + POSITION_WINDOW_SIZE;

/// Hash preimage laid out as `seed ++ round ++ position_window`, reused across rounds.
struct Buf([u8; TOTAL_SIZE]);

impl Buf {
    fn new(seed: &[u8]) -> Self {
        let mut buf = [0; TOTAL_SIZE];
        buf[0..SEED_SIZE].copy_from_slice(seed);
        Self(buf)
    }

    fn set_round(&mut self, round: u8) {
        self.0[SEED_SIZE] = round;
    }

    /// Sets the 4-byte window to `position / 256` (little-endian).
    fn set_position(&mut self, position: usize) {
        self.0[PIVOT_VIEW_SIZE..].copy_from_slice(&((position >> 8) as u32).to_le_bytes());
    }

    fn hash(&self) -> [u8; 32] {
        hash_fixed(&self.0)
    }

    /// Hash of `seed ++ round` only, used to pick the round's pivot.
    fn hash_pivot(&self) -> u64 {
        bytes_to_int64(&hash_fixed(&self.0[0..PIVOT_VIEW_SIZE]))
    }
}

/// Shuffles an entire list in place.
///
/// Equivalent to applying `compute_shuffled_index` to every position, but each round touches
/// each element at most once, so it runs in `O(rounds * n)` hashes / 256.
///
/// With `forwards == false` the inverse permutation is applied, which is the direction committee
/// caches use so that `output[i] == input[compute_shuffled_index(i, ..)]`.
///
/// Returns `None` if the list is empty, larger than `MAX_LIST_SIZE`, `rounds == 0` or the seed
/// is not 32 bytes.
pub fn shuffle_list(
    mut input: Vec<usize>,
    rounds: u8,
    seed: &[u8],
    forwards: bool,
) -> Option<Vec<usize>> {
    let list_size = input.len();

    if input.is_empty() || list_size > MAX_LIST_SIZE || rounds == 0 || seed.len() != SEED_SIZE {
        return None;
    }

    let mut buf = Buf::new(seed);
    let mut r = if forwards { 0 } else { rounds - 1 };

    loop {
        buf.set_round(r);

        let pivot = buf.hash_pivot() as usize % list_size;

        // Swap within the left mirror `[0, pivot]`.
        let mirror = (pivot + 1) >> 1;
        buf.set_position(pivot);
        let mut source = buf.hash();
        let mut byte_v = source[(pivot & 0xff) >> 3];

        for i in 0..mirror {
            let j = pivot - i;

            if j & 0xff == 0xff {
                buf.set_position(j);
                source = buf.hash();
            }
            if j & 0x07 == 0x07 {
                byte_v = source[(j & 0xff) >> 3];
            }
            if (byte_v >> (j & 0x07)) & 0x01 == 1 {
                input.swap(i, j);
            }
        }

        // Swap within the right mirror `(pivot, list_size)`.
        let mirror = (pivot + list_size + 1) >> 1;
        let end = list_size - 1;
        buf.set_position(end);
        let mut source = buf.hash();
        let mut byte_v = source[(end & 0xff) >> 3];

        for (offset, i) in ((pivot + 1)..mirror).enumerate() {
            let j = end - offset;

            if j & 0xff == 0xff {
                buf.set_position(j);
                source = buf.hash();
            }
            if j & 0x07 == 0x07 {
                byte_v = source[(j & 0xff) >> 3];
            }
            if (byte_v >> (j & 0x07)) & 0x01 == 1 {
                input.swap(i, j);
            }
        }

        if forwards {
            r += 1;
            if r == rounds {
                break;
            }
        } else {
            if r == 0 {
                break;
            }
            r -= 1;
        }
    }

    Some(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_shuffled_index;

    const ROUNDS: u8 = 90;

    #[test]
    fn empty_list_is_rejected() {
        assert_eq!(None, shuffle_list(vec![], ROUNDS, &[42; 32], true));
    }

    #[test]
    fn zero_rounds_is_rejected() {
        assert_eq!(None, shuffle_list(vec![0, 1, 2], 0, &[42; 32], true));
    }

    #[test]
    fn backwards_agrees_with_single_index() {
        let seed = [0x5a; 32];
        for list_size in [1usize, 2, 3, 17, 256, 257, 1000] {
            let input: Vec<usize> = (0..list_size).map(|i| i * 3 + 1).collect();
            let shuffled = shuffle_list(input.clone(), ROUNDS, &seed, false).unwrap();

            for (i, value) in shuffled.iter().enumerate() {
                let j = compute_shuffled_index(i, list_size, &seed, ROUNDS).unwrap();
                assert_eq!(*value, input[j], "list_size {} position {}", list_size, i);
            }
        }
    }

    #[test]
    fn forwards_undoes_backwards() {
        let seed = [0x11; 32];
        let input: Vec<usize> = (0..513).collect();
        let backwards = shuffle_list(input.clone(), ROUNDS, &seed, false).unwrap();
        let restored = shuffle_list(backwards, ROUNDS, &seed, true).unwrap();
        assert_eq!(restored, input);
    }

    #[test]
    fn output_is_a_permutation() {
        let input: Vec<usize> = (0..2048).collect();
        let mut output = shuffle_list(input.clone(), ROUNDS, &[7; 32], true).unwrap();
        assert_ne!(output, input);
        output.sort_unstable();
        assert_eq!(output, input);
    }
}
