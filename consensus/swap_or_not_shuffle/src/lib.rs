//! The swap-or-not shuffle used to assign validators to committees and proposal slots.
//!
//! Two entry points compute the same permutation:
//!
//! - `compute_shuffled_index`: the position of a single index after shuffling. Use it when only a
//!   handful of positions out of a large list are needed (e.g. proposer selection).
//! - `shuffle_list`: permutes a whole list at once, far cheaper than calling
//!   `compute_shuffled_index` for every element. Committee caches use this.
//!
//! For any list `l`, `shuffle_list(l, r, s, false)[i] == l[compute_shuffled_index(i, l.len(), s, r)]`.

mod compute_shuffled_index;
mod shuffle_list;

pub use compute_shuffled_index::compute_shuffled_index;
pub use shuffle_list::shuffle_list;

/// Largest list the shuffle accepts. Position windows are 4 bytes wide over 256-bit chunks.
pub const MAX_LIST_SIZE: usize = 1 << 24;

type Hash256 = ethereum_types::H256;

fn bytes_to_int64(slice: &[u8]) -> u64 {
    let mut bytes = [0; 8];
    bytes.copy_from_slice(&slice[0..8]);
    u64::from_le_bytes(bytes)
}
