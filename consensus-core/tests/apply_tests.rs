use alloy_primitives::B256;
use ssz_types::typenum::U512;
use ssz_types::BitVector;
use tree_hash::TreeHash;

use consensus_core::apply::{apply_bootstrap, apply_generic_update};
use consensus_core::types::{
    BLSPubKey, Bootstrap, GenericUpdate, Header, LightClientStore, SyncAggregate, SyncCommittee,
};

fn header(slot: u64) -> Header {
    Header {
        slot,
        proposer_index: 1,
        parent_root: B256::repeat_byte(0x01),
        state_root: B256::repeat_byte(0x02),
        body_root: B256::repeat_byte(0x03),
    }
}

/// A committee whose keys are tagged with one byte, so rotations are
/// observable.
fn committee(tag: u8) -> SyncCommittee {
    SyncCommittee {
        pubkeys: vec![BLSPubKey::repeat_byte(tag); 512].into(),
        aggregate_pubkey: BLSPubKey::repeat_byte(tag),
    }
}

fn bits(count: usize) -> BitVector<U512> {
    let mut bits = BitVector::new();
    for i in 0..count {
        bits.set(i, true).unwrap();
    }
    bits
}

fn store_at(finalized_slot: u64) -> LightClientStore {
    LightClientStore {
        finalized_header: header(finalized_slot),
        current_sync_committee: committee(0xaa),
        next_sync_committee: None,
        optimistic_header: header(finalized_slot),
        previous_max_active_participants: 0,
        current_max_active_participants: 0,
    }
}

fn finality_update(attested_slot: u64, finalized_slot: u64, participation: usize) -> GenericUpdate {
    GenericUpdate {
        attested_header: header(attested_slot),
        sync_aggregate: SyncAggregate {
            sync_committee_bits: bits(participation),
            ..Default::default()
        },
        signature_slot: attested_slot + 1,
        next_sync_committee: None,
        next_sync_committee_branch: None,
        finalized_header: Some(header(finalized_slot)),
        finality_branch: Some(vec![B256::ZERO; 6]),
    }
}

fn assert_store_invariant(store: &LightClientStore) {
    assert!(store.optimistic_header.slot >= store.finalized_header.slot);
}

#[test]
fn bootstrap_initializes_store() {
    let mut store = LightClientStore::default();
    let bootstrap = Bootstrap {
        header: header(5000),
        current_sync_committee: committee(0xaa),
        current_sync_committee_branch: vec![B256::ZERO; 5],
    };

    apply_bootstrap(&mut store, &bootstrap);

    assert_eq!(store.finalized_header, bootstrap.header);
    assert_eq!(store.optimistic_header, bootstrap.header);
    assert_eq!(store.current_sync_committee, bootstrap.current_sync_committee);
    assert!(store.next_sync_committee.is_none());
    assert_eq!(store.previous_max_active_participants, 0);
    assert_eq!(store.current_max_active_participants, 0);
    assert_store_invariant(&store);
}

#[test]
fn optimistic_header_advances_above_safety_threshold() {
    let mut store = store_at(8192);

    // no finality claim: only the optimistic header may move
    let update = GenericUpdate {
        attested_header: header(8300),
        sync_aggregate: SyncAggregate {
            sync_committee_bits: bits(400),
            ..Default::default()
        },
        signature_slot: 8301,
        ..Default::default()
    };

    let checkpoint = apply_generic_update(&mut store, &update);

    assert!(checkpoint.is_none());
    assert_eq!(store.optimistic_header.slot, 8300);
    assert_eq!(store.finalized_header.slot, 8192);
    assert_eq!(store.current_max_active_participants, 400);
    assert_store_invariant(&store);
}

#[test]
fn optimistic_header_holds_below_safety_threshold() {
    let mut store = store_at(8192);
    store.current_max_active_participants = 500;

    let update = GenericUpdate {
        attested_header: header(8300),
        sync_aggregate: SyncAggregate {
            sync_committee_bits: bits(200),
            ..Default::default()
        },
        signature_slot: 8301,
        ..Default::default()
    };

    apply_generic_update(&mut store, &update);

    // threshold is max(500, 0) / 2 = 250, so 200 participants is not enough
    assert_eq!(store.optimistic_header.slot, 8192);
    assert_eq!(store.current_max_active_participants, 500);
    assert_store_invariant(&store);
}

#[test]
fn participation_counters_update_even_for_stale_heads() {
    let mut store = store_at(8192);
    store.optimistic_header = header(8400);

    let update = GenericUpdate {
        attested_header: header(8300),
        sync_aggregate: SyncAggregate {
            sync_committee_bits: bits(480),
            ..Default::default()
        },
        signature_slot: 8301,
        ..Default::default()
    };

    apply_generic_update(&mut store, &update);

    // attested head is older than the optimistic head, but the counter still
    // ratchets up
    assert_eq!(store.optimistic_header.slot, 8400);
    assert_eq!(store.current_max_active_participants, 480);
}

#[test]
fn minority_update_does_not_finalize() {
    let mut store = store_at(8192);

    let update = finality_update(8300, 8256, 341);
    let checkpoint = apply_generic_update(&mut store, &update);

    assert!(checkpoint.is_none());
    assert_eq!(store.finalized_header.slot, 8192);
    // the optimistic header may still move: 341 clears the safety threshold
    assert_eq!(store.optimistic_header.slot, 8300);
    assert_store_invariant(&store);
}

#[test]
fn supermajority_update_finalizes() {
    let mut store = store_at(8192);

    let update = finality_update(8300, 8256, 342);
    apply_generic_update(&mut store, &update);

    assert_eq!(store.finalized_header.slot, 8256);
    assert_store_invariant(&store);
}

#[test]
fn finalized_header_overtakes_optimistic() {
    let mut store = store_at(8100);
    store.optimistic_header = header(8200);
    // a high previous-period count keeps the safety threshold above this
    // update's participation
    store.previous_max_active_participants = 1024;

    let update = finality_update(8300, 8256, 512);
    let checkpoint = apply_generic_update(&mut store, &update);

    // the attested header was not adopted (512 <= 1024 / 2 is false, but
    // threshold 512 requires strictly more), yet the newly finalized header
    // passes it
    assert_eq!(store.finalized_header.slot, 8256);
    assert_eq!(store.optimistic_header.slot, 8256);
    assert!(checkpoint.is_some());
    assert_store_invariant(&store);
}

#[test]
fn checkpoint_emitted_only_on_epoch_boundary() {
    let mut store = store_at(8160);

    let update = finality_update(8300, 8192, 512);
    let checkpoint = apply_generic_update(&mut store, &update);
    assert_eq!(checkpoint, Some(header(8192).tree_hash_root()));

    let update = finality_update(8310, 8193, 512);
    let checkpoint = apply_generic_update(&mut store, &update);
    assert!(checkpoint.is_none());
    assert_eq!(store.finalized_header.slot, 8193);
}

#[test]
fn adopts_next_committee_when_absent() {
    let mut store = store_at(8192);

    // same finalized slot as the store: not newer, but it carries a next
    // committee finalized in the attested period
    let mut update = finality_update(8300, 8192, 512);
    update.next_sync_committee = Some(committee(0xbb));
    update.next_sync_committee_branch = Some(vec![B256::ZERO; 5]);

    let checkpoint = apply_generic_update(&mut store, &update);

    assert!(checkpoint.is_none());
    assert_eq!(store.next_sync_committee, Some(committee(0xbb)));
    assert_eq!(store.finalized_header.slot, 8192);
}

#[test]
fn rotation_at_next_period() {
    let mut store = store_at(8190);
    store.next_sync_committee = Some(committee(0xbb));
    store.current_max_active_participants = 400;

    let mut update = finality_update(8200, 8192, 512);
    update.next_sync_committee = Some(committee(0xcc));
    update.next_sync_committee_branch = Some(vec![B256::ZERO; 5]);

    let checkpoint = apply_generic_update(&mut store, &update);

    // finalized moved into period 1, so the committees rotate
    assert_eq!(store.current_sync_committee, committee(0xbb));
    assert_eq!(store.next_sync_committee, Some(committee(0xcc)));
    // 512 participants were recorded before the rotation zeroed the counter
    assert_eq!(store.previous_max_active_participants, 512);
    assert_eq!(store.current_max_active_participants, 0);
    assert_eq!(store.finalized_header.slot, 8192);
    assert_eq!(checkpoint, Some(header(8192).tree_hash_root()));
    assert_store_invariant(&store);
}

#[test]
fn no_rotation_within_same_period() {
    let mut store = store_at(8192);
    store.next_sync_committee = Some(committee(0xbb));

    let update = finality_update(8300, 8256, 512);
    apply_generic_update(&mut store, &update);

    // finalized stayed in period 1: committees hold
    assert_eq!(store.current_sync_committee, committee(0xaa));
    assert_eq!(store.next_sync_committee, Some(committee(0xbb)));
    assert_eq!(store.finalized_header.slot, 8256);
}
