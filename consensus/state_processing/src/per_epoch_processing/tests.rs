#![cfg(test)]
use crate::per_epoch_processing::{
    process_epoch, process_epoch_with_cancel, process_registry_updates, process_slashings,
};
use crate::per_epoch_processing::errors::EpochProcessingError;
use crate::test_utils::{BlockBuilder, BlockOptions};
use types::*;

type E = MinimalEthSpec;

const VALIDATOR_COUNT: usize = 64;

fn builder(spec: &ChainSpec) -> BlockBuilder<E> {
    BlockBuilder::new(VALIDATOR_COUNT, spec).unwrap()
}

#[test]
fn full_attestation_justifies_and_finalizes() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let target_slot = Epoch::new(4).start_slot(E::slots_per_epoch());

    let mut finalized_epoch = Epoch::new(0);
    while builder.state.slot < target_slot {
        let next = Slot::new(builder.state.slot.as_u64() + 1);
        builder.extend_chain(next, BlockOptions::default()).unwrap();

        // Finality only ever moves forward.
        assert!(builder.state.finalized_checkpoint.epoch >= finalized_epoch);
        finalized_epoch = builder.state.finalized_checkpoint.epoch;
    }

    let state = &builder.state;
    assert_eq!(state.current_justified_checkpoint.epoch, Epoch::new(3));
    assert_eq!(state.previous_justified_checkpoint.epoch, Epoch::new(2));
    assert_eq!(state.finalized_checkpoint.epoch, Epoch::new(2));
    assert_eq!(
        state.finalized_checkpoint.root,
        *state.get_block_root_at_epoch(Epoch::new(2)).unwrap()
    );
}

#[test]
fn summary_reports_full_participation() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    // Stop on the last slot of epoch 1, before its transition.
    let end_slot = Epoch::new(1).end_slot(E::slots_per_epoch());
    builder
        .extend_chain(end_slot, BlockOptions::default())
        .unwrap();

    let mut state = builder.state.clone();
    // Attestations for the final slot of epoch 0 are included in epoch 1, so every previous-epoch
    // validator is a timely target attester.
    let summary = process_epoch(&mut state, &spec).unwrap();
    assert_eq!(
        summary.previous_epoch_target_attesting_balance().unwrap(),
        summary.previous_epoch_total_active_balance()
    );
    assert_eq!(
        summary.previous_epoch_participating_indices(),
        (0..VALIDATOR_COUNT).collect::<Vec<_>>()
    );
    assert!(summary.is_previous_epoch_target_attester(0).unwrap());
    assert!(!summary.is_previous_epoch_target_attester(VALIDATOR_COUNT).unwrap());
}

#[test]
fn participation_rotates() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let end_slot = Epoch::new(1).end_slot(E::slots_per_epoch());
    builder
        .extend_chain(end_slot, BlockOptions::default())
        .unwrap();

    let mut state = builder.state.clone();
    let pre_current = state.current_epoch_participation.clone();
    assert!(pre_current.iter().any(|flags| flags.into_u8() != 0));

    process_epoch(&mut state, &spec).unwrap();

    assert_eq!(state.previous_epoch_participation, pre_current);
    assert_eq!(
        state.current_epoch_participation.len(),
        state.validators.len()
    );
    assert!(state
        .current_epoch_participation
        .iter()
        .all(|flags| flags.into_u8() == 0));
    assert_eq!(state.inactivity_scores.len(), state.validators.len());
}

#[test]
fn inactivity_leak_penalises_absent_validators() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let silent = BlockOptions {
        attest: false,
        sync_aggregate: false,
    };
    // Transitions up to the end of epoch 6 have run; the leak starts once the previous epoch is
    // more than `min_epochs_to_inactivity_penalty` past finality.
    builder
        .extend_chain(Epoch::new(7).start_slot(E::slots_per_epoch()), silent)
        .unwrap();

    let state = &builder.state;
    assert_eq!(state.finalized_checkpoint.epoch, Epoch::new(0));
    assert!(state
        .inactivity_scores
        .iter()
        .all(|score| *score == spec.inactivity_score_bias));
    assert!(state
        .balances
        .iter()
        .all(|balance| *balance < spec.max_effective_balance));
}

#[test]
fn cancelled_transition_leaves_state_untouched() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    builder
        .advance_to_slot(Epoch::new(0).end_slot(E::slots_per_epoch()))
        .unwrap();

    let mut state = builder.state.clone();
    assert!(!state.committee_cache_is_initialized(RelativeEpoch::Next));
    let root = state.canonical_root();

    let cancel = CancelToken::new();
    cancel.cancel();
    assert_eq!(
        process_epoch_with_cancel(&mut state, &spec, &cancel),
        Err(EpochProcessingError::BeaconStateError(
            BeaconStateError::Cancelled
        ))
    );
    assert_eq!(state.canonical_root(), root);
    assert!(state.committee_cache_is_initialized(RelativeEpoch::Current));
    assert!(!state.committee_cache_is_initialized(RelativeEpoch::Next));
}

#[test]
fn churn_limits_activations_in_queue_order() {
    let spec = E::default_spec();
    let mut state = builder(&spec).state;
    state.finalized_checkpoint.epoch = Epoch::new(3);

    let eligibility = [3, 1, 2, 1, 0, 2];
    for (i, epoch) in eligibility.iter().enumerate() {
        let validator = Validator {
            pubkey: pq_crypto::generate_deterministic_keypair(VALIDATOR_COUNT + i).pk,
            effective_balance: spec.max_effective_balance,
            activation_eligibility_epoch: Epoch::new(*epoch),
            activation_epoch: spec.far_future_epoch,
            exit_epoch: spec.far_future_epoch,
            withdrawable_epoch: spec.far_future_epoch,
            ..Validator::default()
        };
        state
            .push_validator(validator, spec.max_effective_balance)
            .unwrap();
    }
    let churn_limit = state.get_validator_churn_limit(&spec).unwrap() as usize;
    assert!(churn_limit < eligibility.len());

    process_registry_updates(&mut state, &spec).unwrap();

    let activation_epoch = state
        .compute_activation_exit_epoch(state.current_epoch(), &spec)
        .unwrap();
    let activated = (VALIDATOR_COUNT..state.validators.len())
        .filter(|&i| state.validators[i].activation_epoch == activation_epoch)
        .collect::<Vec<_>>();
    let queue_order = vec![68, 65, 67, 66, 69, 64];
    assert_eq!(activated.len(), churn_limit);
    let mut expected = queue_order[..churn_limit].to_vec();
    expected.sort_unstable();
    assert_eq!(activated, expected);
}

#[test]
fn deposit_joins_activation_queue() {
    let spec = E::default_spec();
    let mut state = builder(&spec).state;
    state
        .push_validator(
            Validator {
                effective_balance: spec.max_effective_balance,
                ..Validator::default()
            },
            spec.max_effective_balance,
        )
        .unwrap();

    process_registry_updates(&mut state, &spec).unwrap();

    // Queued for the next epoch, which is not yet finalized.
    let fresh = &state.validators[VALIDATOR_COUNT];
    assert_eq!(fresh.activation_eligibility_epoch, state.current_epoch() + 1);
    assert_eq!(fresh.activation_epoch, spec.far_future_epoch);
}

#[test]
fn low_balance_validator_ejected() {
    let spec = E::default_spec();
    let mut state = builder(&spec).state;
    state.validators[7].effective_balance = spec.ejection_balance;

    process_registry_updates(&mut state, &spec).unwrap();

    assert_ne!(state.validators[7].exit_epoch, spec.far_future_epoch);
    assert_eq!(state.validators[8].exit_epoch, spec.far_future_epoch);
}

#[test]
fn slashings_penalise_at_half_window() {
    let spec = E::default_spec();
    let mut state = builder(&spec).state;
    let total_balance = state.get_total_active_balance().unwrap();
    let half_window = <E as EthSpec>::EpochsPerSlashingsVector::to_u64() / 2;

    state.validators[3].slashed = true;
    state.validators[3].withdrawable_epoch = state.current_epoch() + half_window;
    // Slashed, but not at the midpoint of its window.
    state.validators[4].slashed = true;
    state.validators[4].withdrawable_epoch = state.current_epoch() + half_window + 1;
    state
        .set_slashings(state.current_epoch(), spec.max_effective_balance)
        .unwrap();

    process_slashings(&mut state, total_balance, &spec).unwrap();

    let increment = spec.effective_balance_increment;
    let adjusted = std::cmp::min(
        spec.max_effective_balance * spec.proportional_slashing_multiplier,
        total_balance,
    );
    let penalty = spec.max_effective_balance / increment * adjusted / total_balance * increment;
    assert!(penalty > 0);
    assert_eq!(state.balances[3], spec.max_effective_balance - penalty);
    assert_eq!(state.balances[4], spec.max_effective_balance);
}

#[test]
fn epoch_transition_is_deterministic() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    builder
        .extend_chain(
            Epoch::new(1).end_slot(E::slots_per_epoch()),
            BlockOptions::default(),
        )
        .unwrap();

    let mut a = builder.state.clone();
    let mut b = builder.state.clone();
    b.drop_all_caches().unwrap();

    process_epoch(&mut a, &spec).unwrap();
    process_epoch(&mut b, &spec).unwrap();
    assert_eq!(a.canonical_root(), b.canonical_root());
}
