//! Drives a `BeaconState` through slots and blocks with the transition caches in the loop.
//!
//! Every transition works on a clone of the engine's state. The clone only replaces the engine's
//! state once the whole transition has succeeded, so a rejected block or a cancelled advance
//! leaves the engine exactly as it was.
use crate::beacon_proposer_cache::Proposer;
use crate::config::EngineConfig;
use crate::errors::{CacheMaintenanceError, Error};
use crate::metrics;
use crate::single_flight::EpochProtector;
use crate::transition_caches::TransitionCaches;
use pq_crypto::SignatureVerifier;
use slog::{debug, o, Logger};
use state_processing::{
    per_block_processing, per_slot_processing_with_cancel, ConsensusContext,
    EpochProcessingSummary,
};
use std::sync::Arc;
use types::beacon_state::CommitteeCache;
use types::{
    BeaconState, BeaconStateError, CancelToken, ChainSpec, EthSpec, Hash256, RelativeEpoch,
    SignedBeaconBlock, Slot,
};

/// What a successful transition produced besides the new state.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// One summary per epoch boundary crossed, oldest first.
    pub epoch_summaries: Vec<EpochProcessingSummary>,
    /// Cache problems met along the way. None of them affected the result.
    pub maintenance_errors: Vec<CacheMaintenanceError>,
}

pub struct TransitionEngine<E: EthSpec, V: SignatureVerifier> {
    state: BeaconState<E>,
    /// Root of the latest block applied to `state`.
    head_block_root: Hash256,
    spec: ChainSpec,
    config: EngineConfig,
    verifier: V,
    caches: Arc<TransitionCaches>,
    log: Logger,
}

impl<E: EthSpec, V: SignatureVerifier> TransitionEngine<E, V> {
    /// Take ownership of `state`, which may be a genesis state or the post-state of any block.
    pub fn new(
        mut state: BeaconState<E>,
        spec: ChainSpec,
        verifier: V,
        config: EngineConfig,
        log: Logger,
    ) -> Result<Self, Error> {
        let log = log.new(o!("service" => "transition_engine"));
        state.build_caches(&spec)?;
        let head_block_root = state.get_latest_block_root(state.canonical_root());
        let caches = Arc::new(TransitionCaches::new(&config, log.clone()));

        let engine = Self {
            state,
            head_block_root,
            spec,
            config,
            verifier,
            caches,
            log,
        };
        engine.update_protector();
        Ok(engine)
    }

    /// Use `caches` in place of the engine's own, e.g. to share them with an engine following
    /// another fork.
    pub fn with_caches(mut self, caches: Arc<TransitionCaches>) -> Self {
        self.caches = caches;
        self.update_protector();
        self
    }

    pub fn state(&self) -> &BeaconState<E> {
        &self.state
    }

    pub fn into_state(self) -> BeaconState<E> {
        self.state
    }

    pub fn head_block_root(&self) -> Hash256 {
        self.head_block_root
    }

    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn caches(&self) -> &Arc<TransitionCaches> {
        &self.caches
    }

    /// Replace the chain spec. Every cached value was derived under the old spec, so all of them
    /// go, including the caches on the state itself.
    pub fn set_spec(&mut self, spec: ChainSpec) -> Result<(), Error> {
        let mut state = self.state.clone();
        state.drop_all_caches()?;
        state.build_caches(&spec)?;

        self.caches.clear();
        self.spec = spec;
        self.state = state;
        Ok(())
    }

    /// Replace the engine config, starting over with empty caches sized to suit it.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.caches = Arc::new(TransitionCaches::new(&config, self.log.clone()));
        self.config = config;
        self.update_protector();
    }

    /// Advance the state through empty slots until it reaches `target_slot`.
    pub fn process_slots(
        &mut self,
        target_slot: Slot,
        cancel: &CancelToken,
    ) -> Result<TransitionOutcome, Error> {
        let _timer = metrics::start_timer(&metrics::ENGINE_SLOT_PROCESSING_TIMES);

        if target_slot < self.state.slot {
            return Err(Error::SlotInPast {
                state_slot: self.state.slot,
                target_slot,
            });
        }

        let mut state = self.state.clone();
        let mut outcome = TransitionOutcome::default();
        if let Err(e) = self.advance(&mut state, target_slot, cancel, &mut outcome) {
            metrics::inc_counter(&metrics::ENGINE_TRANSITION_FAILURES);
            debug!(
                self.log,
                "Slot processing abandoned";
                "target_slot" => target_slot.as_u64(),
                "error" => ?e,
            );
            return Err(e);
        }

        self.state = state;
        self.update_protector();
        Ok(outcome)
    }

    /// Apply `block`, advancing through any skipped slots before it.
    pub fn process_block(
        &mut self,
        block: &SignedBeaconBlock<E>,
        cancel: &CancelToken,
    ) -> Result<TransitionOutcome, Error> {
        let _timer = metrics::start_timer(&metrics::ENGINE_BLOCK_PROCESSING_TIMES);

        match self.apply_block(block, cancel) {
            Ok((state, block_root, outcome)) => {
                metrics::inc_counter(&metrics::ENGINE_BLOCK_PROCESSING_SUCCESSES);
                debug!(
                    self.log,
                    "Applied block";
                    "slot" => block.slot().as_u64(),
                    "block_root" => ?block_root,
                    "epochs_crossed" => outcome.epoch_summaries.len(),
                );
                self.state = state;
                self.head_block_root = block_root;
                self.update_protector();
                Ok(outcome)
            }
            Err(e) => {
                metrics::inc_counter(&metrics::ENGINE_TRANSITION_FAILURES);
                debug!(
                    self.log,
                    "Rejected block";
                    "slot" => block.slot().as_u64(),
                    "error" => ?e,
                );
                Err(e)
            }
        }
    }

    /// The proposer for `slot`, which may be in any epoch from the state's current epoch on.
    pub fn get_proposer(&self, slot: Slot) -> Result<Proposer, Error> {
        let epoch = slot.epoch(E::slots_per_epoch());
        let state_epoch = self.state.current_epoch();
        if epoch < state_epoch {
            return Err(Error::ProposerEpochInPast { epoch, state_epoch });
        }

        let mut outcome = TransitionOutcome::default();
        if epoch == state_epoch {
            return Ok(self.caches.proposers.get_slot(
                &self.state,
                self.head_block_root,
                slot,
                &self.spec,
                &mut outcome.maintenance_errors,
            )?);
        }

        let mut state = self.state.clone();
        self.advance(
            &mut state,
            epoch.start_slot(E::slots_per_epoch()),
            &CancelToken::new(),
            &mut outcome,
        )?;
        Ok(self.caches.proposers.get_slot(
            &state,
            self.head_block_root,
            slot,
            &self.spec,
            &mut outcome.maintenance_errors,
        )?)
    }

    /// The committee cache for `relative_epoch` of the engine's state.
    pub fn committee_cache(
        &self,
        relative_epoch: RelativeEpoch,
    ) -> Result<Arc<CommitteeCache>, Error> {
        let epoch = relative_epoch.into_epoch(self.state.current_epoch());
        let committee_cache = self.caches.shuffling.get_or_compute(
            &self.state,
            self.head_block_root,
            relative_epoch,
            &self.spec,
            &CancelToken::new(),
            &mut vec![],
        )?;
        if !committee_cache.is_initialized_at(epoch) {
            return Err(Error::ShufflingEpochMismatch {
                expected: epoch,
                found: committee_cache.initialized_epoch(),
            });
        }
        Ok(committee_cache)
    }

    fn apply_block(
        &self,
        block: &SignedBeaconBlock<E>,
        cancel: &CancelToken,
    ) -> Result<(BeaconState<E>, Hash256, TransitionOutcome), Error> {
        let block_slot = block.slot();
        if block_slot < self.state.slot {
            return Err(Error::BlockSlotInPast {
                state_slot: self.state.slot,
                block_slot,
            });
        }
        if block.parent_root() != self.head_block_root {
            return Err(Error::UnknownParent {
                parent_root: block.parent_root(),
                head_root: self.head_block_root,
            });
        }

        let spec = &self.spec;
        let mut state = self.state.clone();
        let mut outcome = TransitionOutcome::default();
        self.advance(&mut state, block_slot, cancel, &mut outcome)?;

        self.caches.prime_block(
            &mut state,
            self.head_block_root,
            spec,
            cancel,
            &mut outcome.maintenance_errors,
        )?;
        let proposer = self.caches.proposers.get_slot(
            &state,
            self.head_block_root,
            block_slot,
            spec,
            &mut outcome.maintenance_errors,
        )?;

        let block_root = block.canonical_root();
        let mut ctxt = ConsensusContext::new(block_slot)
            .set_proposer_index(proposer.index as u64)
            .set_current_block_root(block_root);
        per_block_processing(
            &mut state,
            block,
            self.config.signature_strategy(),
            &self.verifier,
            &mut ctxt,
            spec,
        )?;

        if self.config.verify_state_root {
            let local = state.canonical_root();
            if local != block.state_root() {
                return Err(Error::StateRootMismatch {
                    block: block.state_root(),
                    local,
                });
            }
        }

        Ok((state, block_root, outcome))
    }

    /// Run `per_slot_processing` on `state` up to `target_slot`, filling the state's caches from
    /// the transition caches before each epoch boundary.
    fn advance(
        &self,
        state: &mut BeaconState<E>,
        target_slot: Slot,
        cancel: &CancelToken,
        outcome: &mut TransitionOutcome,
    ) -> Result<(), Error> {
        while state.slot < target_slot {
            // Committee builds poll the token themselves, but a cache hit skips the build.
            if cancel.is_cancelled() {
                return Err(BeaconStateError::Cancelled.into());
            }

            if state.can_process_epoch() {
                self.caches.prime_epoch_transition(
                    state,
                    self.head_block_root,
                    &self.spec,
                    cancel,
                    &mut outcome.maintenance_errors,
                )?;
            }

            if let Some(summary) = per_slot_processing_with_cancel(state, None, &self.spec, cancel)?
            {
                // The old next-epoch shuffling is now the current one.
                self.caches.shuffling.remember(
                    state,
                    self.head_block_root,
                    RelativeEpoch::Current,
                    &mut outcome.maintenance_errors,
                );
                self.caches
                    .total_active_balance
                    .prime(state, &self.spec, &mut outcome.maintenance_errors)?;
                outcome.epoch_summaries.push(summary);
            }
        }
        Ok(())
    }

    fn update_protector(&self) {
        let head_epoch = self.state.current_epoch();
        let finalized_epoch = self.state.finalized_checkpoint.epoch;
        self.caches.update_protector(EpochProtector {
            head_epoch,
            finalized_epoch,
        });
        metrics::set_gauge(&metrics::ENGINE_HEAD_SLOT, self.state.slot.as_u64() as i64);
        metrics::set_gauge(
            &metrics::ENGINE_FINALIZED_EPOCH,
            finalized_epoch.as_u64() as i64,
        );
    }
}

impl<E: EthSpec, V: SignatureVerifier> std::fmt::Debug for TransitionEngine<E, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionEngine")
            .field("slot", &self.state.slot)
            .field("head_block_root", &self.head_block_root)
            .field("config", &self.config)
            .finish()
    }
}
