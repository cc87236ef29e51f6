use types::*;

/// Returns validator indices which participated in the attestation, sorted by increasing index.
pub fn get_attesting_indices<E: EthSpec>(
    committee: &[usize],
    bitlist: &BitList<E::MaxValidatorsPerCommittee>,
) -> Result<Vec<u64>, BeaconStateError> {
    if bitlist.len() != committee.len() {
        return Err(BeaconStateError::InvalidBitfield);
    }

    let mut indices = Vec::with_capacity(bitlist.num_set_bits());

    for (i, validator_index) in committee.iter().enumerate() {
        if let Ok(true) = bitlist.get(i) {
            indices.push(*validator_index as u64)
        }
    }

    indices.sort_unstable();

    Ok(indices)
}

/// Shortcut for getting the attesting indices while fetching the committee from the state's cache.
pub fn get_attesting_indices_from_state<E: EthSpec>(
    state: &BeaconState<E>,
    att: &Attestation<E>,
) -> Result<Vec<u64>, BeaconStateError> {
    let committee = state.get_beacon_committee(att.data.slot, att.data.index)?;
    get_attesting_indices::<E>(committee.committee, &att.aggregation_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use std::collections::HashSet;

    type E = MinimalEthSpec;

    fn bits(len: usize, mask: u64) -> BitList<<E as EthSpec>::MaxValidatorsPerCommittee> {
        let mut bits = BitList::with_capacity(len).unwrap();
        for i in 0..len {
            bits.set(i, mask >> i & 1 == 1).unwrap();
        }
        bits
    }

    #[test]
    fn rejects_wrong_length() {
        let committee = vec![4, 9, 2];
        assert_eq!(
            get_attesting_indices::<E>(&committee, &bits(4, 0b1)),
            Err(BeaconStateError::InvalidBitfield)
        );
    }

    #[test]
    fn sorted_by_validator_index() {
        let committee = vec![40, 9, 22, 3];
        assert_eq!(
            get_attesting_indices::<E>(&committee, &bits(4, 0b1011)).unwrap(),
            vec![3, 9, 40]
        );
    }

    #[quickcheck]
    fn disjoint_bitfields_partition_the_union(a: u32, b: u32) -> bool {
        let committee: Vec<usize> = (0..32).map(|i| (i * 7919) % 1000).collect();
        let a = u64::from(a);
        let b = u64::from(b) & !a;

        let set = |mask| -> HashSet<u64> {
            get_attesting_indices::<E>(&committee, &bits(32, mask))
                .unwrap()
                .into_iter()
                .collect()
        };
        let (left, right, union) = (set(a), set(b), set(a | b));

        left.is_disjoint(&right) && left.union(&right).cloned().collect::<HashSet<_>>() == union
    }
}
