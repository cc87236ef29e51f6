use super::*;
use crate::{ChainSpec, MinimalEthSpec};
use pq_crypto::generate_deterministic_keypair;

type E = MinimalEthSpec;

/// A state at `slot` with `validator_count` active validators at max effective balance.
fn state_with_validators(validator_count: usize, slot: Slot, spec: &ChainSpec) -> BeaconState<E> {
    let mut state = BeaconState::<E>::new(0, ExecutionData::default(), spec);
    for i in 0..validator_count {
        let validator = Validator {
            pubkey: generate_deterministic_keypair(i).pk,
            withdrawal_credentials: Hash256::zero(),
            effective_balance: spec.max_effective_balance,
            slashed: false,
            activation_eligibility_epoch: Epoch::new(0),
            activation_epoch: Epoch::new(0),
            exit_epoch: spec.far_future_epoch,
            withdrawable_epoch: spec.far_future_epoch,
        };
        state
            .push_validator(validator, spec.max_effective_balance)
            .unwrap();
    }
    state.slot = slot;
    for (i, mix) in state.randao_mixes.iter_mut().enumerate() {
        *mix = Hash256::from_low_u64_be(i as u64 + 1);
    }
    state
}

#[test]
fn caches_are_excluded_from_hash_and_equality() {
    let spec = E::default_spec();
    let mut state = state_with_validators(16, Slot::new(9), &spec);
    let bare = state.clone();

    state.build_caches(&spec).unwrap();
    assert_eq!(state, bare);
    assert_eq!(state.canonical_root(), bare.canonical_root());

    state.drop_all_caches().unwrap();
    assert!(!state.committee_cache_is_initialized(RelativeEpoch::Current));
    assert!(state.get_total_active_balance().is_err());
}

#[test]
fn every_active_validator_sits_in_exactly_one_committee() {
    let spec = E::default_spec();
    let validator_count = 64;
    let mut state = state_with_validators(validator_count, Slot::new(16), &spec);
    state.build_all_committee_caches(&spec).unwrap();

    for relative_epoch in [
        RelativeEpoch::Previous,
        RelativeEpoch::Current,
        RelativeEpoch::Next,
    ] {
        let committees = state.get_beacon_committees_at_epoch(relative_epoch).unwrap();
        let mut seen: Vec<usize> = committees
            .iter()
            .flat_map(|c| c.committee.iter().copied())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..validator_count).collect::<Vec<_>>());
    }
}

#[test]
fn committee_lookup_matches_attestation_duties() {
    let spec = E::default_spec();
    let mut state = state_with_validators(32, Slot::new(8), &spec);
    state
        .build_committee_cache(RelativeEpoch::Current, &spec)
        .unwrap();

    for validator_index in 0..32 {
        let duty = state
            .get_attestation_duties(validator_index, RelativeEpoch::Current)
            .unwrap()
            .unwrap();
        let committee = state.get_beacon_committee(duty.slot, duty.index).unwrap();
        assert_eq!(committee.committee[duty.committee_position], validator_index);
        assert_eq!(committee.committee.len(), duty.committee_len);
    }
}

#[test]
fn uninitialized_committee_cache_is_an_error() {
    let spec = E::default_spec();
    let state = state_with_validators(8, Slot::new(8), &spec);
    assert_eq!(
        state.committee_cache(RelativeEpoch::Current).err(),
        Some(Error::CommitteeCacheUninitialized(Some(
            RelativeEpoch::Current
        )))
    );
}

#[test]
fn advancing_caches_rotates_next_into_current() {
    let spec = E::default_spec();
    let mut state = state_with_validators(16, Slot::new(15), &spec);
    state.build_all_committee_caches(&spec).unwrap();
    let next = state.committee_cache(RelativeEpoch::Next).unwrap().clone();

    state.slot = Slot::new(16);
    state.advance_caches().unwrap();

    assert_eq!(state.committee_cache(RelativeEpoch::Current).unwrap(), &next);
    assert!(!state.committee_cache_is_initialized(RelativeEpoch::Next));
}

#[test]
fn install_committee_cache_checks_epoch() {
    let spec = E::default_spec();
    let mut state = state_with_validators(16, Slot::new(16), &spec);
    let current = state
        .initialize_committee_cache(state.current_epoch(), &spec)
        .unwrap();

    assert!(matches!(
        state.install_committee_cache(RelativeEpoch::Next, current.clone()),
        Err(Error::CommitteeCacheEpochMismatch { .. })
    ));
    state
        .install_committee_cache(RelativeEpoch::Current, current)
        .unwrap();
    assert!(state.committee_cache_is_initialized(RelativeEpoch::Current));
}

#[test]
fn cancelled_committee_build_leaves_cache_untouched() {
    let spec = E::default_spec();
    let mut state = state_with_validators(16, Slot::new(8), &spec);
    let cancel = CancelToken::new();
    cancel.cancel();

    assert_eq!(
        state.build_committee_cache_with_cancel(RelativeEpoch::Current, &spec, &cancel),
        Err(Error::Cancelled)
    );
    assert!(!state.committee_cache_is_initialized(RelativeEpoch::Current));
}

#[test]
fn proposers_are_deterministic_and_active() {
    let spec = E::default_spec();
    let state = state_with_validators(32, Slot::new(8), &spec);

    let proposers = state.get_beacon_proposer_indices(&spec).unwrap();
    assert_eq!(proposers.len(), E::slots_per_epoch() as usize);
    assert_eq!(proposers, state.get_beacon_proposer_indices(&spec).unwrap());

    for (slot, proposer) in state
        .current_epoch()
        .slot_iter(E::slots_per_epoch())
        .zip(proposers)
    {
        assert_eq!(state.get_beacon_proposer_index(slot, &spec).unwrap(), proposer);
        assert!(proposer < 32);
    }

    assert_eq!(
        state.get_beacon_proposer_index(Slot::new(0), &spec),
        Err(Error::SlotOutOfBounds)
    );
}

#[test]
fn proposer_selection_without_validators_fails() {
    let spec = E::default_spec();
    let state = state_with_validators(0, Slot::new(8), &spec);
    assert_eq!(
        state.get_beacon_proposer_index(Slot::new(8), &spec),
        Err(Error::InsufficientValidators)
    );
}

#[test]
fn total_active_balance_cache_is_epoch_scoped() {
    let spec = E::default_spec();
    let mut state = state_with_validators(4, Slot::new(8), &spec);
    state.build_total_active_balance_cache(&spec).unwrap();
    assert_eq!(
        state.get_total_active_balance().unwrap(),
        4 * spec.max_effective_balance
    );

    state.slot = Slot::new(16);
    assert_eq!(
        state.get_total_active_balance(),
        Err(Error::TotalActiveBalanceCacheInconsistent {
            initialized_epoch: Epoch::new(1),
            current_epoch: Epoch::new(2),
        })
    );
}

#[test]
fn total_active_balance_is_floored_at_one_increment() {
    let spec = E::default_spec();
    let state = state_with_validators(0, Slot::new(0), &spec);
    assert_eq!(
        state.compute_total_active_balance_slow(&spec).unwrap(),
        spec.effective_balance_increment
    );
}

#[test]
fn pubkey_cache_tracks_registry() {
    let spec = E::default_spec();
    let mut state = state_with_validators(4, Slot::new(0), &spec);
    assert!(matches!(
        state.get_validator_index(&generate_deterministic_keypair(0).pk),
        Err(Error::PubkeyCacheIncomplete { .. })
    ));

    state.update_pubkey_cache().unwrap();
    assert_eq!(
        state
            .get_validator_index(&generate_deterministic_keypair(3).pk)
            .unwrap(),
        Some(3)
    );
    assert_eq!(
        state
            .get_validator_index(&generate_deterministic_keypair(4).pk)
            .unwrap(),
        None
    );
}

#[test]
fn randao_mix_bounds() {
    let spec = E::default_spec();
    let mut state = state_with_validators(1, Slot::new(16), &spec);
    let current = state.current_epoch();

    assert!(state.get_randao_mix(current).is_ok());
    assert_eq!(
        state.get_randao_mix(current + 1),
        Err(Error::EpochOutOfBounds)
    );
    state.set_randao_mix(current + 1, Hash256::repeat_byte(7)).unwrap();

    let before = *state.get_randao_mix(current).unwrap();
    let reveal = SignatureBytes::empty();
    state.update_randao_mix(current, &reveal).unwrap();
    assert_ne!(*state.get_randao_mix(current).unwrap(), before);
}

#[test]
fn block_root_bounds() {
    let spec = E::default_spec();
    let mut state = state_with_validators(1, Slot::new(10), &spec);
    state.set_block_root(Slot::new(9), Hash256::repeat_byte(9)).unwrap();

    assert_eq!(
        *state.get_block_root(Slot::new(9)).unwrap(),
        Hash256::repeat_byte(9)
    );
    assert_eq!(
        state.get_block_root(Slot::new(10)),
        Err(Error::SlotOutOfBounds)
    );
}

#[test]
fn next_sync_committee_is_full_and_drawn_from_active_set() {
    let spec = E::default_spec();
    let state = state_with_validators(8, Slot::new(8), &spec);
    let committee = state.get_next_sync_committee(&spec).unwrap();

    assert_eq!(committee.pubkeys.len(), E::sync_committee_size());
    let active: Vec<_> = (0..8).map(|i| generate_deterministic_keypair(i).pk).collect();
    assert!(committee.pubkeys.iter().all(|pk| active.contains(pk)));
}
