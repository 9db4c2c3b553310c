use alloy_primitives::B256;
use config::Forks;
use tree_hash::TreeHash;

use crate::bls::is_aggregate_valid;
use crate::errors::ConsensusError;
use crate::proof::{
    is_current_committee_proof_valid, is_finality_proof_valid, is_next_committee_proof_valid,
};
use crate::types::{
    Bootstrap, FinalityUpdate, GenericUpdate, LightClientStore, OptimisticUpdate, Update,
};
use crate::utils::{
    calc_sync_period, calculate_fork_version, compute_committee_sign_root, compute_fork_data_root,
    get_bits, get_participating_keys,
};

/// Checks that a bootstrap belongs to the trusted checkpoint: the header
/// must hash to the checkpoint root and the current sync committee must be
/// proven against the header's state.
pub fn verify_bootstrap(bootstrap: &Bootstrap, checkpoint: B256) -> Result<(), ConsensusError> {
    let committee_valid = is_current_committee_proof_valid(
        &bootstrap.header,
        &bootstrap.current_sync_committee,
        &bootstrap.current_sync_committee_branch,
    );

    if !committee_valid {
        return Err(ConsensusError::InvalidCurrentSyncCommitteeProof);
    }

    let header_hash = bootstrap.header.tree_hash_root();
    if header_hash != checkpoint {
        return Err(ConsensusError::InvalidHeaderHash {
            expected: checkpoint,
            found: header_hash,
        });
    }

    Ok(())
}

pub fn verify_update(
    update: &Update,
    expected_current_slot: u64,
    store: &LightClientStore,
    genesis_root: B256,
    forks: &Forks,
) -> Result<(), ConsensusError> {
    let update = GenericUpdate::from(update);
    verify_generic_update(&update, expected_current_slot, store, genesis_root, forks)
}

pub fn verify_finality_update(
    update: &FinalityUpdate,
    expected_current_slot: u64,
    store: &LightClientStore,
    genesis_root: B256,
    forks: &Forks,
) -> Result<(), ConsensusError> {
    let update = GenericUpdate::from(update);
    verify_generic_update(&update, expected_current_slot, store, genesis_root, forks)
}

pub fn verify_optimistic_update(
    update: &OptimisticUpdate,
    expected_current_slot: u64,
    store: &LightClientStore,
    genesis_root: B256,
    forks: &Forks,
) -> Result<(), ConsensusError> {
    let update = GenericUpdate::from(update);
    verify_generic_update(&update, expected_current_slot, store, genesis_root, forks)
}

/// The verification predicate. Every clause must hold before the applier is
/// allowed to fold the update into the store.
pub fn verify_generic_update(
    update: &GenericUpdate,
    expected_current_slot: u64,
    store: &LightClientStore,
    genesis_root: B256,
    forks: &Forks,
) -> Result<(), ConsensusError> {
    let bits = get_bits(&update.sync_aggregate.sync_committee_bits);
    if bits == 0 {
        return Err(ConsensusError::InsufficientParticipation);
    }

    let update_finalized_slot = update
        .finalized_header
        .as_ref()
        .map(|header| header.slot)
        .unwrap_or(0);
    let valid_time = expected_current_slot >= update.signature_slot
        && update.signature_slot > update.attested_header.slot
        && update.attested_header.slot >= update_finalized_slot;

    if !valid_time {
        return Err(ConsensusError::InvalidTimestamp);
    }

    let store_period = calc_sync_period(store.finalized_header.slot);
    let update_sig_period = calc_sync_period(update.signature_slot);

    let valid_period = if store.next_sync_committee.is_some() {
        update_sig_period == store_period || update_sig_period == store_period + 1
    } else {
        update_sig_period == store_period
    };

    if !valid_period {
        return Err(ConsensusError::InvalidPeriod);
    }

    let update_attested_period = calc_sync_period(update.attested_header.slot);
    let update_has_next_committee = store.next_sync_committee.is_none()
        && update.next_sync_committee.is_some()
        && update_attested_period == store_period;

    if update.attested_header.slot <= store.finalized_header.slot && !update_has_next_committee {
        return Err(ConsensusError::NotRelevant);
    }

    if let Some(finalized_header) = &update.finalized_header {
        let Some(finality_branch) = &update.finality_branch else {
            return Err(ConsensusError::InvalidFinalityProof);
        };

        if !is_finality_proof_valid(&update.attested_header, finalized_header, finality_branch) {
            return Err(ConsensusError::InvalidFinalityProof);
        }
    }

    if let Some(next_sync_committee) = &update.next_sync_committee {
        let Some(next_sync_committee_branch) = &update.next_sync_committee_branch else {
            return Err(ConsensusError::InvalidNextSyncCommitteeProof);
        };

        if !is_next_committee_proof_valid(
            &update.attested_header,
            next_sync_committee,
            next_sync_committee_branch,
        ) {
            return Err(ConsensusError::InvalidNextSyncCommitteeProof);
        }
    }

    // The committee that signed is fixed by the signature slot's period
    // relative to the store's finalized period.
    let sync_committee = if update_sig_period == store_period {
        &store.current_sync_committee
    } else {
        store
            .next_sync_committee
            .as_ref()
            .ok_or(ConsensusError::InvalidPeriod)?
    };

    let pks = get_participating_keys(sync_committee, &update.sync_aggregate.sync_committee_bits);

    let fork_version = calculate_fork_version(forks, update.signature_slot);
    let fork_data_root = compute_fork_data_root(fork_version, genesis_root);
    let header_root = update.attested_header.tree_hash_root();
    let signing_root = compute_committee_sign_root(header_root, fork_data_root);

    if !is_aggregate_valid(
        &update.sync_aggregate.sync_committee_signature,
        signing_root.as_slice(),
        &pks,
    ) {
        return Err(ConsensusError::InvalidSignature);
    }

    Ok(())
}
