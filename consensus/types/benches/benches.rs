#![allow(deprecated)]

use criterion::Criterion;
use criterion::{black_box, criterion_group, criterion_main, Benchmark};
use rayon::prelude::*;
use ssz::{Decode, Encode};
use tree_hash::TreeHash;
use types::{
    BeaconState, Epoch, EthSpec, ExecutionData, Hash256, MainnetEthSpec, RelativeEpoch,
    Validator,
};

fn get_state<E: EthSpec>(validator_count: usize) -> BeaconState<E> {
    let spec = &E::default_spec();
    let mut state = BeaconState::new(0, ExecutionData::default(), spec);

    let validators = (0..validator_count)
        .collect::<Vec<_>>()
        .par_iter()
        .map(|&i| Validator {
            pubkey: pq_crypto::generate_deterministic_keypair(i).pk,
            withdrawal_credentials: Hash256::from_low_u64_le(i as u64),
            effective_balance: spec.max_effective_balance,
            slashed: false,
            activation_eligibility_epoch: Epoch::new(0),
            activation_epoch: Epoch::new(0),
            exit_epoch: Epoch::from(u64::max_value()),
            withdrawable_epoch: Epoch::from(u64::max_value()),
        })
        .collect::<Vec<_>>();

    for validator in validators {
        state
            .push_validator(validator, spec.max_effective_balance)
            .expect("should add validator");
    }

    state
}

fn all_benches(c: &mut Criterion) {
    let validator_count = 16_384;
    let spec = MainnetEthSpec::default_spec();

    let mut state = get_state::<MainnetEthSpec>(validator_count);
    state.build_caches(&spec).expect("should build caches");
    let state_bytes = state.as_ssz_bytes();

    let inner_state = state.clone();
    c.bench(
        &format!("{}_validators", validator_count),
        Benchmark::new("encode/beacon_state", move |b| {
            b.iter_batched_ref(
                || inner_state.clone(),
                |state| black_box(state.as_ssz_bytes()),
                criterion::BatchSize::SmallInput,
            )
        })
        .sample_size(10),
    );

    c.bench(
        &format!("{}_validators", validator_count),
        Benchmark::new("decode/beacon_state", move |b| {
            b.iter_batched_ref(
                || state_bytes.clone(),
                |bytes| {
                    let state: BeaconState<MainnetEthSpec> =
                        BeaconState::from_ssz_bytes(bytes).expect("should decode");
                    black_box(state)
                },
                criterion::BatchSize::SmallInput,
            )
        })
        .sample_size(10),
    );

    let inner_state = state.clone();
    c.bench(
        &format!("{}_validators", validator_count),
        Benchmark::new("clone/beacon_state", move |b| {
            b.iter_batched_ref(
                || inner_state.clone(),
                |state| black_box(state.clone()),
                criterion::BatchSize::SmallInput,
            )
        })
        .sample_size(10),
    );

    let inner_state = state.clone();
    c.bench(
        &format!("{}_validators", validator_count),
        Benchmark::new("tree_hash_root/beacon_state", move |b| {
            b.iter_batched_ref(
                || inner_state.clone(),
                |state| black_box(state.tree_hash_root()),
                criterion::BatchSize::SmallInput,
            )
        })
        .sample_size(10),
    );

    let inner_state = state.clone();
    c.bench(
        &format!("{}_validators", validator_count),
        Benchmark::new("committee_cache/next_epoch", move |b| {
            b.iter_batched_ref(
                || inner_state.clone(),
                |state| {
                    black_box(
                        state
                            .force_build_committee_cache(RelativeEpoch::Next, &spec)
                            .expect("should build committee cache"),
                    )
                },
                criterion::BatchSize::SmallInput,
            )
        })
        .sample_size(10),
    );
}

criterion_group!(benches, all_benches,);
criterion_main!(benches);
