use beacon_transition::{
    EngineConfig, EpochKey, Error, ShufflingCache, TransitionCaches, TransitionEngine,
};
use logging::test_logger;
use pq_crypto::TestScheme;
use state_processing::state_advance::complete_state_advance;
use state_processing::test_utils::{BlockBuilder, BlockOptions};
use state_processing::BlockSignatureStrategy;
use std::sync::Arc;
use types::*;

const VALIDATOR_COUNT: usize = 64;

type E = MinimalEthSpec;
type Engine = TransitionEngine<E, TestScheme>;

fn slot(epoch: u64, offset: u64) -> Slot {
    Epoch::new(epoch).start_slot(E::slots_per_epoch()) + offset
}

fn builder(spec: &ChainSpec) -> BlockBuilder<E> {
    BlockBuilder::new(VALIDATOR_COUNT, spec).unwrap()
}

fn engine(builder: &BlockBuilder<E>, config: EngineConfig) -> Engine {
    TransitionEngine::new(
        builder.state.clone(),
        builder.spec.clone(),
        TestScheme,
        config,
        test_logger(),
    )
    .unwrap()
}

/// Produce a block at each of `slots` on top of the builder's chain, applying each as it goes.
fn blocks_at(
    builder: &mut BlockBuilder<E>,
    slots: impl IntoIterator<Item = Slot>,
) -> Vec<SignedBeaconBlock<E>> {
    slots
        .into_iter()
        .map(|slot| {
            let block = builder.produce_block(slot, BlockOptions::default()).unwrap();
            builder
                .process_block(&block, BlockSignatureStrategy::VerifyBulk)
                .unwrap();
            block
        })
        .collect()
}

/// A chain into epoch 3 with a few skipped slots, two of them across epoch boundaries.
fn skipping_chain(builder: &mut BlockBuilder<E>) -> Vec<SignedBeaconBlock<E>> {
    let slots = (1..=slot(3, 2).as_u64())
        .map(Slot::new)
        .filter(|s| ![slot(1, 0), slot(1, 5), slot(2, 0), slot(2, 1)].contains(s));
    blocks_at(builder, slots)
}

fn apply_all(engine: &mut Engine, blocks: &[SignedBeaconBlock<E>]) -> Vec<Hash256> {
    blocks
        .iter()
        .map(|block| {
            engine.process_block(block, &CancelToken::new()).unwrap();
            assert_eq!(engine.head_block_root(), block.canonical_root());
            engine.state().canonical_root()
        })
        .collect()
}

/// Give `block` a different state root and sign it again, so only the state root is wrong.
fn with_wrong_state_root(
    builder: &BlockBuilder<E>,
    block: &SignedBeaconBlock<E>,
) -> SignedBeaconBlock<E> {
    let mut message = block.message.clone();
    message.state_root = Hash256::repeat_byte(0xee);
    let proposer = &builder.keypairs[message.proposer_index as usize];
    message.sign(
        &TestScheme,
        &proposer.sk,
        &builder.state.fork,
        builder.state.genesis_validators_root,
        &builder.spec,
    )
}

#[test]
fn follows_a_chain_of_blocks() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let mut engine = engine(&builder, EngineConfig::default());
    let blocks = skipping_chain(&mut builder);

    let roots = apply_all(&mut engine, &blocks);
    for (root, block) in roots.iter().zip(&blocks) {
        assert_eq!(*root, block.state_root());
    }
    assert_eq!(engine.state().canonical_root(), builder.state.canonical_root());
    assert!(!engine.caches().shuffling.is_empty());
    assert!(!engine.caches().proposers.is_empty());
    assert!(!engine.caches().total_active_balance.is_empty());
}

#[test]
fn epoch_summaries_are_reported_per_boundary() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let mut engine = engine(&builder, EngineConfig::default());
    let blocks = blocks_at(&mut builder, [slot(0, 1), slot(2, 3)]);

    let first = engine.process_block(&blocks[0], &CancelToken::new()).unwrap();
    assert!(first.epoch_summaries.is_empty());
    let second = engine.process_block(&blocks[1], &CancelToken::new()).unwrap();
    assert_eq!(second.epoch_summaries.len(), 2);
    assert!(second.maintenance_errors.is_empty());
}

#[test]
fn disabled_caches_give_identical_states() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let mut cached = engine(&builder, EngineConfig::default());
    let mut uncached = engine(&builder, EngineConfig::without_caches());
    let blocks = skipping_chain(&mut builder);

    assert_eq!(
        apply_all(&mut cached, &blocks),
        apply_all(&mut uncached, &blocks)
    );

    let target = slot(5, 3);
    let cached_outcome = cached.process_slots(target, &CancelToken::new()).unwrap();
    let uncached_outcome = uncached.process_slots(target, &CancelToken::new()).unwrap();
    assert_eq!(cached_outcome, uncached_outcome);
    assert_eq!(
        cached.state().canonical_root(),
        uncached.state().canonical_root()
    );
    assert!(uncached.caches().is_empty());
}

#[test]
fn rejected_block_leaves_state_untouched() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let mut engine = engine(&builder, EngineConfig::default());
    let blocks = blocks_at(&mut builder, [slot(0, 1), slot(1, 2)]);
    engine.process_block(&blocks[0], &CancelToken::new()).unwrap();

    let pre_root = engine.state().canonical_root();
    let pre_head = engine.head_block_root();
    let bad = with_wrong_state_root(&builder, &blocks[1]);
    assert_eq!(
        engine.process_block(&bad, &CancelToken::new()),
        Err(Error::StateRootMismatch {
            block: Hash256::repeat_byte(0xee),
            local: blocks[1].state_root(),
        })
    );
    assert_eq!(engine.state().canonical_root(), pre_root);
    assert_eq!(engine.state().slot, slot(0, 1));
    assert_eq!(engine.head_block_root(), pre_head);

    engine.process_block(&blocks[1], &CancelToken::new()).unwrap();
    assert_eq!(engine.state().canonical_root(), blocks[1].state_root());
}

#[test]
fn state_root_check_can_be_disabled() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let config = EngineConfig {
        verify_state_root: false,
        ..EngineConfig::default()
    };
    let mut engine = engine(&builder, config);
    let blocks = blocks_at(&mut builder, [slot(0, 1)]);

    let bad = with_wrong_state_root(&builder, &blocks[0]);
    engine.process_block(&bad, &CancelToken::new()).unwrap();
    assert_eq!(engine.state().canonical_root(), blocks[0].state_root());
}

#[test]
fn invalid_signature_is_rejected() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let mut engine = engine(&builder, EngineConfig::default());
    let blocks = blocks_at(&mut builder, [slot(0, 1)]);

    let mut bad = blocks[0].clone();
    bad.signature = SignatureBytes::empty();
    let pre_root = engine.state().canonical_root();
    assert!(matches!(
        engine.process_block(&bad, &CancelToken::new()),
        Err(Error::BlockProcessingError(_))
    ));
    assert_eq!(engine.state().canonical_root(), pre_root);
}

#[test]
fn blocks_must_extend_the_head() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let mut engine = engine(&builder, EngineConfig::default());
    let blocks = blocks_at(&mut builder, [slot(0, 1), slot(0, 2)]);

    assert_eq!(
        engine.process_block(&blocks[1], &CancelToken::new()),
        Err(Error::UnknownParent {
            parent_root: blocks[1].parent_root(),
            head_root: engine.head_block_root(),
        })
    );

    apply_all(&mut engine, &blocks);
    assert_eq!(
        engine.process_block(&blocks[0], &CancelToken::new()),
        Err(Error::BlockSlotInPast {
            state_slot: slot(0, 2),
            block_slot: slot(0, 1),
        })
    );
    assert_eq!(
        engine.process_slots(slot(0, 1), &CancelToken::new()),
        Err(Error::SlotInPast {
            state_slot: slot(0, 2),
            target_slot: slot(0, 1),
        })
    );
}

#[test]
fn cancelled_advance_leaves_state_untouched() {
    let spec = E::default_spec();
    let builder = builder(&spec);
    let mut engine = engine(&builder, EngineConfig::default());
    let pre_root = engine.state().canonical_root();

    let cancel = CancelToken::new();
    cancel.cancel();
    let error = engine.process_slots(slot(2, 0), &cancel).unwrap_err();
    assert!(error.is_cancelled());
    assert_eq!(engine.state().slot, Slot::new(0));
    assert_eq!(engine.state().canonical_root(), pre_root);

    // The same advance goes through with a fresh token.
    engine.process_slots(slot(2, 0), &CancelToken::new()).unwrap();
    assert_eq!(engine.state().slot, slot(2, 0));
}

#[test]
fn proposers_match_the_state() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let mut engine = engine(&builder, EngineConfig::default());
    let blocks = blocks_at(&mut builder, [slot(0, 1), slot(1, 1)]);
    apply_all(&mut engine, &blocks);

    let state = engine.state().clone();
    for s in slot(1, 1).as_u64()..slot(2, 0).as_u64() {
        let s = Slot::new(s);
        let proposer = engine.get_proposer(s).unwrap();
        assert_eq!(proposer.index, state.get_beacon_proposer_index(s, &spec).unwrap());
        assert_eq!(proposer.fork, state.fork);
    }

    let mut advanced = state.clone();
    complete_state_advance(&mut advanced, None, slot(3, 0), &spec).unwrap();
    for s in slot(3, 0).as_u64()..slot(4, 0).as_u64() {
        let s = Slot::new(s);
        assert_eq!(
            engine.get_proposer(s).unwrap().index,
            advanced.get_beacon_proposer_index(s, &spec).unwrap()
        );
    }
    // Looking ahead does not move the engine.
    assert_eq!(engine.state().canonical_root(), state.canonical_root());

    assert_eq!(
        engine.get_proposer(slot(0, 3)),
        Err(Error::ProposerEpochInPast {
            epoch: Epoch::new(0),
            state_epoch: Epoch::new(1),
        })
    );
}

#[test]
fn committee_caches_match_fresh_builds() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let mut engine = engine(&builder, EngineConfig::default());
    let blocks = blocks_at(&mut builder, [slot(0, 1), slot(1, 3)]);
    apply_all(&mut engine, &blocks);

    let state = engine.state();
    for relative_epoch in [
        RelativeEpoch::Previous,
        RelativeEpoch::Current,
        RelativeEpoch::Next,
    ] {
        let epoch = relative_epoch.into_epoch(state.current_epoch());
        let fresh = state.initialize_committee_cache(epoch, &spec).unwrap();
        let cached = engine.committee_cache(relative_epoch).unwrap();
        assert_eq!(cached.shuffling(), fresh.shuffling());
        assert!(cached.is_initialized_at(epoch));
    }

    // Asking for the next epoch stores it under the head's decision root.
    let key = ShufflingCache::shuffling_id(state, engine.head_block_root(), RelativeEpoch::Next)
        .unwrap();
    assert!(engine.caches().shuffling.contains(&key));
}

#[test]
fn spec_change_clears_caches() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let mut engine = engine(&builder, EngineConfig::default());
    let blocks = blocks_at(&mut builder, [slot(0, 1), slot(1, 1), slot(1, 2)]);
    apply_all(&mut engine, &blocks[..2]);
    assert!(!engine.caches().is_empty());

    let pre_root = engine.state().canonical_root();
    engine.set_spec(spec.clone()).unwrap();
    assert!(engine.caches().is_empty());
    assert_eq!(engine.state().canonical_root(), pre_root);

    apply_all(&mut engine, &blocks[2..]);
    assert_eq!(engine.state().canonical_root(), blocks[2].state_root());
}

#[test]
fn config_change_resizes_caches() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let mut engine = engine(&builder, EngineConfig::default());
    let blocks = blocks_at(&mut builder, [slot(0, 1), slot(1, 1), slot(2, 1)]);
    apply_all(&mut engine, &blocks[..2]);

    engine.set_config(EngineConfig::without_caches());
    assert!(engine.caches().is_empty());
    apply_all(&mut engine, &blocks[2..]);
    assert!(engine.caches().is_empty());
    assert_eq!(engine.state().canonical_root(), blocks[2].state_root());
}

#[test]
fn shared_caches_serve_a_second_engine() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let caches = Arc::new(TransitionCaches::new(&EngineConfig::default(), test_logger()));
    let mut first = engine(&builder, EngineConfig::default()).with_caches(caches.clone());
    let mut second = engine(&builder, EngineConfig::default()).with_caches(caches.clone());
    let blocks = skipping_chain(&mut builder);

    apply_all(&mut first, &blocks);
    let sizes = (
        caches.shuffling.len(),
        caches.proposers.len(),
        caches.total_active_balance.len(),
    );
    apply_all(&mut second, &blocks);

    assert_eq!(
        first.state().canonical_root(),
        second.state().canonical_root()
    );
    // Every value the second engine needed was already there.
    assert_eq!(
        sizes,
        (
            caches.shuffling.len(),
            caches.proposers.len(),
            caches.total_active_balance.len(),
        )
    );
}

#[test]
fn engines_on_separate_threads_agree() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let caches = Arc::new(TransitionCaches::new(&EngineConfig::default(), test_logger()));
    let engines = (0..2)
        .map(|_| engine(&builder, EngineConfig::default()).with_caches(caches.clone()))
        .collect::<Vec<_>>();
    let blocks = Arc::new(skipping_chain(&mut builder));

    let handles = engines
        .into_iter()
        .map(|mut engine| {
            let blocks = blocks.clone();
            std::thread::spawn(move || {
                apply_all(&mut engine, &blocks);
                engine.state().canonical_root()
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), builder.state.canonical_root());
    }
}

#[test]
fn finalized_and_head_shufflings_are_protected() {
    let spec = E::default_spec();
    let mut builder = builder(&spec);
    let config = EngineConfig {
        shuffling_cache_size: 2,
        ..EngineConfig::default()
    };
    let mut engine = engine(&builder, config);
    let genesis_key = EpochKey::new(Epoch::new(0), engine.head_block_root());
    let blocks = blocks_at(&mut builder, (1..=slot(4, 1).as_u64()).map(Slot::new));
    apply_all(&mut engine, &blocks);

    let state = engine.state();
    assert!(state.finalized_checkpoint.epoch > Epoch::new(0));
    let head_key =
        ShufflingCache::shuffling_id(state, engine.head_block_root(), RelativeEpoch::Current)
            .unwrap();
    assert!(engine.caches().shuffling.contains(&head_key));
    // Genesis is neither head nor finalized any more, so it made way.
    assert!(!engine.caches().shuffling.contains(&genesis_key));
}
