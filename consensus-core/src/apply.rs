use alloy_primitives::B256;
use tracing::{debug, info};
use tree_hash::TreeHash;

use crate::types::{
    Bootstrap, FinalityUpdate, GenericUpdate, LightClientStore, OptimisticUpdate, Update,
};
use crate::utils::{calc_sync_period, get_bits};

/// Initializes the store from a verified bootstrap. Both headers start at
/// the bootstrap header and the participation counters at zero.
pub fn apply_bootstrap(store: &mut LightClientStore, bootstrap: &Bootstrap) {
    *store = LightClientStore {
        finalized_header: bootstrap.header,
        current_sync_committee: bootstrap.current_sync_committee.clone(),
        next_sync_committee: None,
        optimistic_header: bootstrap.header,
        previous_max_active_participants: 0,
        current_max_active_participants: 0,
    };
}

pub fn apply_update(store: &mut LightClientStore, update: &Update) -> Option<B256> {
    let update = GenericUpdate::from(update);
    apply_generic_update(store, &update)
}

pub fn apply_finality_update(store: &mut LightClientStore, update: &FinalityUpdate) -> Option<B256> {
    let update = GenericUpdate::from(update);
    apply_generic_update(store, &update)
}

pub fn apply_optimistic_update(
    store: &mut LightClientStore,
    update: &OptimisticUpdate,
) -> Option<B256> {
    let update = GenericUpdate::from(update);
    apply_generic_update(store, &update)
}

/// Folds a verified update into the store. Returns the tree hash root of the
/// new finalized header when it lands on an epoch boundary, which is then
/// trustable as a fresh checkpoint.
pub fn apply_generic_update(store: &mut LightClientStore, update: &GenericUpdate) -> Option<B256> {
    let committee_bits = get_bits(&update.sync_aggregate.sync_committee_bits);

    store.current_max_active_participants =
        u64::max(store.current_max_active_participants, committee_bits);

    let should_update_optimistic = committee_bits > safety_threshold(store)
        && update.attested_header.slot > store.optimistic_header.slot;

    if should_update_optimistic {
        store.optimistic_header = update.attested_header;
    }

    let update_attested_period = calc_sync_period(update.attested_header.slot);

    let update_finalized_slot = update
        .finalized_header
        .as_ref()
        .map(|header| header.slot)
        .unwrap_or(0);
    let update_finalized_period = calc_sync_period(update_finalized_slot);

    let update_has_finalized_next_committee = store.next_sync_committee.is_none()
        && update.has_sync_update()
        && update.has_finality_update()
        && update_finalized_period == update_attested_period;

    let has_majority = committee_bits * 3 >= 512 * 2;
    if !has_majority {
        debug!(target: "lucerna::consensus", "skipping block with low vote count");
    }

    let update_is_newer = update_finalized_slot > store.finalized_header.slot;
    let good_update = update_is_newer || update_has_finalized_next_committee;

    if !(has_majority && good_update) {
        return None;
    }

    let store_period = calc_sync_period(store.finalized_header.slot);

    if store.next_sync_committee.is_none() {
        store.next_sync_committee = update.next_sync_committee.clone();
    } else if update_finalized_period == store_period + 1 {
        if let Some(next) = store.next_sync_committee.take() {
            info!(target: "lucerna::consensus", "sync committee updated");
            store.current_sync_committee = next;
            store.next_sync_committee = update.next_sync_committee.clone();
            store.previous_max_active_participants = store.current_max_active_participants;
            store.current_max_active_participants = 0;
        }
    }

    if update_is_newer {
        if let Some(finalized_header) = update.finalized_header {
            store.finalized_header = finalized_header;

            if store.finalized_header.slot > store.optimistic_header.slot {
                store.optimistic_header = store.finalized_header;
            }

            if store.finalized_header.slot % 32 == 0 {
                return Some(store.finalized_header.tree_hash_root());
            }
        }
    }

    None
}

/// Half the larger of the current and previous period's observed
/// participation.
fn safety_threshold(store: &LightClientStore) -> u64 {
    u64::max(
        store.current_max_active_participants,
        store.previous_max_active_participants,
    ) / 2
}
