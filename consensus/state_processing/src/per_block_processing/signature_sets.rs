//! A `SignatureSet` is an abstraction over the components of a signature. A `SignatureSet` may be
//! validated individually, or alongside in others in a potentially cheaper bulk operation.
//!
//! This module exposes one function to extract each type of `SignatureSet` from a `BeaconBlock`.
//! Signatures are never aggregated: a set carries exactly one signature per signing key.
use pq_crypto::SignatureSet;
use std::borrow::Cow;
use tree_hash::TreeHash;
use types::{
    Attestation, AttesterSlashing, BeaconBlock, BeaconState, BeaconStateError, ChainSpec,
    DepositData, Domain, EthSpec, Fork, Hash256, IndexedAttestation, ProposerSlashing,
    PublicKeyBytes, SignatureBytes, SignedBeaconBlock, SignedBeaconBlockHeader, SignedRoot,
    SignedVoluntaryExit, SigningData, Slot, SyncAggregate,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// There was an error attempting to read from a `BeaconState`. Block
    /// validity was not determined.
    BeaconStateError(BeaconStateError),
    /// Attempted to find the public key of a validator that does not exist. You cannot distinguish
    /// between an error and an invalid block in this case.
    ValidatorUnknown(u64),
    /// The `BeaconBlock` has a `proposer_index` that does not match the index we computed locally.
    ///
    /// The block is invalid.
    IncorrectBlockProposer { block: u64, local_shuffling: u64 },
    /// The signatures supplied do not match the number of keys that must have signed.
    ///
    /// The block is invalid.
    MismatchedSignatureCount { pubkeys: usize, signatures: usize },
    /// The signature collaborator rejected its inputs.
    Crypto(pq_crypto::Error),
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Error {
        Error::BeaconStateError(e)
    }
}

impl From<pq_crypto::Error> for Error {
    fn from(e: pq_crypto::Error) -> Error {
        match e {
            pq_crypto::Error::MismatchedSignatureSet { keys, signatures } => {
                Error::MismatchedSignatureCount {
                    pubkeys: keys,
                    signatures,
                }
            }
            e => Error::Crypto(e),
        }
    }
}

/// Helper function to get a public key from a `state`.
pub fn get_pubkey_from_state<E>(
    state: &BeaconState<E>,
    validator_index: usize,
) -> Option<Cow<PublicKeyBytes>>
where
    E: EthSpec,
{
    state
        .validators
        .get(validator_index)
        .map(|v| Cow::Borrowed(&v.pubkey))
}

/// A signature set that is valid if a block was signed by the expected block producer.
pub fn block_proposal_signature_set<'a, E, F>(
    state: &'a BeaconState<E>,
    get_pubkey: F,
    signed_block: &'a SignedBeaconBlock<E>,
    block_root: Option<Hash256>,
    spec: &'a ChainSpec,
) -> Result<SignatureSet<'a>>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>>,
{
    let block = &signed_block.message;
    let proposer_index = state.get_beacon_proposer_index(block.slot, spec)? as u64;

    if proposer_index != block.proposer_index {
        return Err(Error::IncorrectBlockProposer {
            block: block.proposer_index,
            local_shuffling: proposer_index,
        });
    }

    block_proposal_signature_set_from_parts(
        signed_block,
        block_root,
        proposer_index,
        &state.fork,
        state.genesis_validators_root,
        get_pubkey,
        spec,
    )
}

/// A signature set that is valid if a block was signed by the expected block producer.
///
/// Unlike `block_proposal_signature_set` this does **not** check that the proposer index is
/// correct according to the shuffling. It should only be used if no suitable `BeaconState` is
/// available.
pub fn block_proposal_signature_set_from_parts<'a, E, F>(
    signed_block: &'a SignedBeaconBlock<E>,
    block_root: Option<Hash256>,
    proposer_index: u64,
    fork: &Fork,
    genesis_validators_root: Hash256,
    get_pubkey: F,
    spec: &'a ChainSpec,
) -> Result<SignatureSet<'a>>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>>,
{
    let block = &signed_block.message;
    let domain = spec.get_domain(
        block.slot.epoch(E::slots_per_epoch()),
        Domain::BeaconProposer,
        fork,
        genesis_validators_root,
    );

    let message = if let Some(root) = block_root {
        SigningData {
            object_root: root,
            domain,
        }
        .tree_hash_root()
    } else {
        block.signing_root(domain)
    };

    Ok(SignatureSet::single_pubkey(
        &signed_block.signature,
        get_pubkey(proposer_index as usize).ok_or(Error::ValidatorUnknown(proposer_index))?,
        message,
    ))
}

/// A signature set that is valid if the block proposers randao reveal signature is correct.
pub fn randao_signature_set<'a, E, F>(
    state: &'a BeaconState<E>,
    get_pubkey: F,
    block: &'a BeaconBlock<E>,
    spec: &'a ChainSpec,
) -> Result<SignatureSet<'a>>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>>,
{
    let proposer_index = state.get_beacon_proposer_index(block.slot, spec)?;

    let domain = spec.get_domain(
        block.slot.epoch(E::slots_per_epoch()),
        Domain::Randao,
        &state.fork,
        state.genesis_validators_root,
    );

    let message = block.slot.epoch(E::slots_per_epoch()).signing_root(domain);

    Ok(SignatureSet::single_pubkey(
        &block.body.randao_reveal,
        get_pubkey(proposer_index).ok_or(Error::ValidatorUnknown(proposer_index as u64))?,
        message,
    ))
}

/// Returns two signature sets, one for each `BlockHeader` included in the `ProposerSlashing`.
pub fn proposer_slashing_signature_set<'a, E, F>(
    state: &'a BeaconState<E>,
    get_pubkey: F,
    proposer_slashing: &'a ProposerSlashing,
    spec: &'a ChainSpec,
) -> Result<(SignatureSet<'a>, SignatureSet<'a>)>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>>,
{
    let proposer_index = proposer_slashing.signed_header_1.message.proposer_index as usize;

    Ok((
        block_header_signature_set(
            state,
            &proposer_slashing.signed_header_1,
            get_pubkey(proposer_index)
                .ok_or(Error::ValidatorUnknown(proposer_index as u64))?,
            spec,
        ),
        block_header_signature_set(
            state,
            &proposer_slashing.signed_header_2,
            get_pubkey(proposer_index)
                .ok_or(Error::ValidatorUnknown(proposer_index as u64))?,
            spec,
        ),
    ))
}

/// Returns a signature set that is valid if the given `pubkey` signed the `header`.
fn block_header_signature_set<'a, E: EthSpec>(
    state: &'a BeaconState<E>,
    signed_header: &'a SignedBeaconBlockHeader,
    pubkey: Cow<'a, PublicKeyBytes>,
    spec: &'a ChainSpec,
) -> SignatureSet<'a> {
    let domain = spec.get_domain(
        signed_header.message.slot.epoch(E::slots_per_epoch()),
        Domain::BeaconProposer,
        &state.fork,
        state.genesis_validators_root,
    );

    let message = signed_header.message.signing_root(domain);

    SignatureSet::single_pubkey(&signed_header.signature, pubkey, message)
}

/// Returns the signature set for the given `indexed_attestation`.
///
/// `signatures[i]` must belong to `attesting_indices[i]`.
pub fn indexed_attestation_signature_set<'a, E, F>(
    state: &'a BeaconState<E>,
    get_pubkey: F,
    indexed_attestation: &'a IndexedAttestation<E>,
    spec: &'a ChainSpec,
) -> Result<SignatureSet<'a>>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>>,
{
    indexed_attestation_signature_set_from_pubkeys(
        get_pubkey,
        indexed_attestation,
        &state.fork,
        state.genesis_validators_root,
        spec,
    )
}

/// Returns the signature set for the given `indexed_attestation` but the fork and genesis
/// validators root are supplied directly instead of from the state.
pub fn indexed_attestation_signature_set_from_pubkeys<'a, E, F>(
    get_pubkey: F,
    indexed_attestation: &'a IndexedAttestation<E>,
    fork: &Fork,
    genesis_validators_root: Hash256,
    spec: &'a ChainSpec,
) -> Result<SignatureSet<'a>>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>>,
{
    let mut pubkeys = Vec::with_capacity(indexed_attestation.attesting_indices.len());
    for &validator_idx in &indexed_attestation.attesting_indices {
        pubkeys.push(
            get_pubkey(validator_idx as usize).ok_or(Error::ValidatorUnknown(validator_idx))?,
        );
    }

    let domain = spec.get_domain(
        indexed_attestation.data.target.epoch,
        Domain::BeaconAttester,
        fork,
        genesis_validators_root,
    );

    let message = indexed_attestation.data.signing_root(domain);
    let signatures = indexed_attestation
        .signatures
        .iter()
        .map(Cow::Borrowed)
        .collect();

    Ok(SignatureSet::multiple_pubkeys(signatures, pubkeys, message)?)
}

/// Returns the signature set for an `attestation` straight from its committee.
///
/// Signatures are paired with committee members in committee order, which is the order the
/// attestation carries them in. This avoids building the indexed form when only the
/// signatures are of interest.
pub fn attestation_signature_set<'a, E, F>(
    state: &'a BeaconState<E>,
    get_pubkey: F,
    attestation: &'a Attestation<E>,
    committee: &[usize],
    spec: &'a ChainSpec,
) -> Result<SignatureSet<'a>>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>>,
{
    if attestation.aggregation_bits.len() != committee.len() {
        return Err(BeaconStateError::InvalidBitfield.into());
    }

    let mut pubkeys = Vec::with_capacity(attestation.signatures.len());
    for (i, &validator_idx) in committee.iter().enumerate() {
        if let Ok(true) = attestation.aggregation_bits.get(i) {
            pubkeys.push(
                get_pubkey(validator_idx).ok_or(Error::ValidatorUnknown(validator_idx as u64))?,
            );
        }
    }

    let domain = spec.get_domain(
        attestation.data.target.epoch,
        Domain::BeaconAttester,
        &state.fork,
        state.genesis_validators_root,
    );

    let message = attestation.data.signing_root(domain);
    let signatures = attestation.signatures.iter().map(Cow::Borrowed).collect();

    Ok(SignatureSet::multiple_pubkeys(signatures, pubkeys, message)?)
}

/// Returns the signature set for the given `attester_slashing` and corresponding `pubkeys`.
pub fn attester_slashing_signature_sets<'a, E, F>(
    state: &'a BeaconState<E>,
    get_pubkey: F,
    attester_slashing: &'a AttesterSlashing<E>,
    spec: &'a ChainSpec,
) -> Result<(SignatureSet<'a>, SignatureSet<'a>)>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>> + Clone,
{
    Ok((
        indexed_attestation_signature_set(
            state,
            get_pubkey.clone(),
            &attester_slashing.attestation_1,
            spec,
        )?,
        indexed_attestation_signature_set(
            state,
            get_pubkey,
            &attester_slashing.attestation_2,
            spec,
        )?,
    ))
}

/// Returns the signature values in a `Deposit`, if they're well formed. Otherwise, returns `None`.
///
/// Deposits are signed with the genesis fork domain so they stay valid across forks.
pub fn deposit_pubkey_signature_message<'a>(
    deposit_data: &'a DepositData,
    spec: &ChainSpec,
) -> Option<(&'a PublicKeyBytes, &'a SignatureBytes, Hash256)> {
    if deposit_data.signature.is_empty() {
        return None;
    }
    let domain = spec.get_deposit_domain();
    let message = deposit_data.as_deposit_message().signing_root(domain);
    Some((&deposit_data.pubkey, &deposit_data.signature, message))
}

/// Returns a signature set that is valid if the `SignedVoluntaryExit` was signed by the indicated
/// validator.
pub fn exit_signature_set<'a, E, F>(
    state: &'a BeaconState<E>,
    get_pubkey: F,
    signed_exit: &'a SignedVoluntaryExit,
    spec: &'a ChainSpec,
) -> Result<SignatureSet<'a>>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>>,
{
    let exit = &signed_exit.message;
    let proposer_index = exit.validator_index as usize;

    let domain = spec.get_domain(
        exit.epoch,
        Domain::VoluntaryExit,
        &state.fork,
        state.genesis_validators_root,
    );

    let message = exit.signing_root(domain);

    Ok(SignatureSet::single_pubkey(
        &signed_exit.signature,
        get_pubkey(proposer_index).ok_or(Error::ValidatorUnknown(proposer_index as u64))?,
        message,
    ))
}

/// Signature set verifier for a block's `sync_aggregate`.
///
/// The `slot` should be the slot of the block that the sync aggregate is included in, which may be
/// different from `state.slot`. The `block_root` should be the block root that the sync aggregate
/// signs over. It's passed in rather than extracted from the `state` because when verifying a batch
/// of blocks the `state` will not yet have had the blocks applied.
///
/// Returns `Ok(None)` when no committee member participated, since there is nothing to verify.
pub fn sync_aggregate_signature_set<'a, E>(
    sync_aggregate: &'a SyncAggregate<E>,
    slot: Slot,
    block_root: Hash256,
    state: &'a BeaconState<E>,
    spec: &ChainSpec,
) -> Result<Option<SignatureSet<'a>>>
where
    E: EthSpec,
{
    if sync_aggregate.sync_committee_bits.is_zero()
        && sync_aggregate.sync_committee_signatures.is_empty()
    {
        return Ok(None);
    }

    let committee_pubkeys = &state
        .get_built_sync_committee(slot.epoch(E::slots_per_epoch()), spec)?
        .pubkeys;

    let participant_pubkeys = committee_pubkeys
        .iter()
        .zip(sync_aggregate.sync_committee_bits.iter())
        .filter_map(|(pubkey, bit)| bit.then_some(Cow::Borrowed(pubkey)))
        .collect::<Vec<_>>();

    let previous_slot = slot.saturating_sub(1u64);

    let domain = spec.get_domain(
        previous_slot.epoch(E::slots_per_epoch()),
        Domain::SyncCommittee,
        &state.fork,
        state.genesis_validators_root,
    );

    let message = SigningData {
        object_root: block_root,
        domain,
    }
    .tree_hash_root();

    let signatures = sync_aggregate
        .sync_committee_signatures
        .iter()
        .map(Cow::Borrowed)
        .collect();

    Ok(Some(SignatureSet::multiple_pubkeys(
        signatures,
        participant_pubkeys,
        message,
    )?))
}
