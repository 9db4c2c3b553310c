use alloy_primitives::{b256, fixed_bytes, B256};
use blst::min_pk::{AggregateSignature, SecretKey};
use config::{Fork, Forks};
use sha2::{Digest, Sha256};
use ssz_types::typenum::U512;
use ssz_types::BitVector;
use tree_hash::TreeHash;

use consensus_core::bls::DST;
use consensus_core::errors::ConsensusError;
use consensus_core::types::{
    BLSPubKey, Bootstrap, GenericUpdate, Header, LightClientStore, SignatureBytes, SyncAggregate,
    SyncCommittee,
};
use consensus_core::utils::{
    calculate_fork_version, compute_committee_sign_root, compute_fork_data_root,
};
use consensus_core::verify::{verify_bootstrap, verify_generic_update};

const GENESIS_ROOT: B256 =
    b256!("4242424242424242424242424242424242424242424242424242424242424242");

fn forks() -> Forks {
    Forks {
        genesis: Fork {
            epoch: 0,
            fork_version: fixed_bytes!("00000000"),
        },
        altair: Fork {
            epoch: 0,
            fork_version: fixed_bytes!("01000000"),
        },
        bellatrix: Fork {
            epoch: 0,
            fork_version: fixed_bytes!("02000000"),
        },
        capella: Fork {
            epoch: 0,
            fork_version: fixed_bytes!("03000000"),
        },
        deneb: Fork {
            epoch: 0,
            fork_version: fixed_bytes!("04000000"),
        },
    }
}

fn header(slot: u64) -> Header {
    Header {
        slot,
        proposer_index: 1,
        parent_root: B256::repeat_byte(0x01),
        state_root: B256::repeat_byte(0x02),
        body_root: B256::repeat_byte(0x03),
    }
}

fn committee_keys(count: usize) -> Vec<SecretKey> {
    committee_keys_from(count, 1)
}

fn committee_keys_from(count: usize, first_seed: u64) -> Vec<SecretKey> {
    (0..count)
        .map(|i| {
            let mut ikm = [0u8; 32];
            ikm[..8].copy_from_slice(&(i as u64 + first_seed).to_le_bytes());
            SecretKey::key_gen(&ikm, &[]).unwrap()
        })
        .collect()
}

fn committee_of(keys: &[SecretKey]) -> SyncCommittee {
    let pubkeys = keys
        .iter()
        .map(|key| BLSPubKey::from_slice(&key.sk_to_pk().compress()))
        .collect::<Vec<_>>();

    SyncCommittee {
        pubkeys: pubkeys.into(),
        aggregate_pubkey: BLSPubKey::ZERO,
    }
}

fn all_bits() -> BitVector<U512> {
    let mut bits = BitVector::new();
    for i in 0..512 {
        bits.set(i, true).unwrap();
    }
    bits
}

/// Signs the attested header the way the sync committee would at
/// `signature_slot`.
fn sign_header(keys: &[SecretKey], attested_header: &Header, signature_slot: u64) -> SignatureBytes {
    let fork_version = calculate_fork_version(&forks(), signature_slot);
    let fork_data_root = compute_fork_data_root(fork_version, GENESIS_ROOT);
    let signing_root =
        compute_committee_sign_root(attested_header.tree_hash_root(), fork_data_root);

    let sigs = keys
        .iter()
        .map(|key| key.sign(signing_root.as_slice(), DST, &[]))
        .collect::<Vec<_>>();
    let sig_refs = sigs.iter().collect::<Vec<_>>();
    let aggregate = AggregateSignature::aggregate(&sig_refs, true).unwrap();

    SignatureBytes::from_slice(&aggregate.to_signature().compress())
}

/// Computes the root a Merkle branch folds to, so a fixture can plant it as
/// the attested state root.
fn fold_branch(leaf_root: B256, branch: &[B256], index: usize) -> B256 {
    let mut derived = leaf_root;
    for (i, node) in branch.iter().enumerate() {
        let mut hasher = Sha256::new();
        if (index / 2usize.pow(i as u32)) % 2 != 0 {
            hasher.update(node);
            hasher.update(derived);
        } else {
            hasher.update(derived);
            hasher.update(node);
        }
        derived = B256::from_slice(&hasher.finalize());
    }
    derived
}

fn branch_of(len: usize) -> Vec<B256> {
    (0..len).map(|i| B256::repeat_byte(0x10 + i as u8)).collect()
}

struct Fixture {
    keys: Vec<SecretKey>,
    store: LightClientStore,
}

impl Fixture {
    /// A store finalized at the start of period 1, owning a committee of 512
    /// real keys.
    fn new() -> Self {
        let keys = committee_keys(512);
        let committee = committee_of(&keys);
        let finalized_header = header(8192);

        Self {
            keys,
            store: LightClientStore {
                finalized_header,
                current_sync_committee: committee,
                next_sync_committee: None,
                optimistic_header: finalized_header,
                previous_max_active_participants: 0,
                current_max_active_participants: 0,
            },
        }
    }

    /// A fully valid finality update against the fixture store.
    fn finality_update(&self) -> GenericUpdate {
        let finalized_header = header(8256);
        let finality_branch = branch_of(6);
        let state_root = fold_branch(finalized_header.tree_hash_root(), &finality_branch, 41);

        let mut attested_header = header(8300);
        attested_header.state_root = state_root;

        let signature_slot = attested_header.slot + 1;
        let signature = sign_header(&self.keys, &attested_header, signature_slot);

        GenericUpdate {
            attested_header,
            sync_aggregate: SyncAggregate {
                sync_committee_bits: all_bits(),
                sync_committee_signature: signature,
            },
            signature_slot,
            next_sync_committee: None,
            next_sync_committee_branch: None,
            finalized_header: Some(finalized_header),
            finality_branch: Some(finality_branch),
        }
    }

    fn verify(&self, update: &GenericUpdate, expected_current_slot: u64) -> Result<(), ConsensusError> {
        verify_generic_update(
            update,
            expected_current_slot,
            &self.store,
            GENESIS_ROOT,
            &forks(),
        )
    }
}

#[test]
fn accepts_valid_finality_update() {
    let fixture = Fixture::new();
    let update = fixture.finality_update();

    assert_eq!(fixture.verify(&update, 9000), Ok(()));
}

#[test]
fn accepts_partial_participation() {
    let fixture = Fixture::new();
    let mut update = fixture.finality_update();

    // only the first 400 members sign
    let mut bits = BitVector::new();
    for i in 0..400 {
        bits.set(i, true).unwrap();
    }
    update.sync_aggregate.sync_committee_bits = bits;
    update.sync_aggregate.sync_committee_signature = sign_header(
        &fixture.keys[..400],
        &update.attested_header,
        update.signature_slot,
    );

    assert_eq!(fixture.verify(&update, 9000), Ok(()));
}

#[test]
fn rejects_zero_participation() {
    let fixture = Fixture::new();
    let mut update = fixture.finality_update();
    update.sync_aggregate.sync_committee_bits = BitVector::new();

    assert_eq!(
        fixture.verify(&update, 9000),
        Err(ConsensusError::InsufficientParticipation)
    );
}

#[test]
fn rejects_signature_slot_equal_to_attested_slot() {
    let fixture = Fixture::new();
    let mut update = fixture.finality_update();
    update.signature_slot = update.attested_header.slot;

    assert_eq!(
        fixture.verify(&update, 9000),
        Err(ConsensusError::InvalidTimestamp)
    );
}

#[test]
fn rejects_update_from_the_future() {
    let fixture = Fixture::new();
    let update = fixture.finality_update();

    // expected current slot lags behind the signature slot
    assert_eq!(
        fixture.verify(&update, update.signature_slot - 1),
        Err(ConsensusError::InvalidTimestamp)
    );
}

#[test]
fn rejects_signature_period_too_far_ahead() {
    let mut fixture = Fixture::new();
    fixture.store.next_sync_committee = Some(fixture.store.current_sync_committee.clone());

    let mut update = fixture.finality_update();
    // store period is 1; period 3 is out of range even with a known next
    // committee
    update.attested_header.slot = 3 * 8192 + 10;
    update.signature_slot = update.attested_header.slot + 1;

    assert_eq!(
        fixture.verify(&update, 4 * 8192),
        Err(ConsensusError::InvalidPeriod)
    );
}

#[test]
fn rejects_next_period_signature_without_next_committee() {
    let fixture = Fixture::new();
    let mut update = fixture.finality_update();
    update.attested_header.slot = 2 * 8192 + 10;
    update.signature_slot = update.attested_header.slot + 1;

    assert_eq!(
        fixture.verify(&update, 3 * 8192),
        Err(ConsensusError::InvalidPeriod)
    );
}

#[test]
fn rejects_stale_update_without_next_committee() {
    let fixture = Fixture::new();
    let mut update = fixture.finality_update();

    // attested no newer than the finalized store head, and nothing new to
    // offer
    update.attested_header.slot = fixture.store.finalized_header.slot;
    update.finalized_header = None;
    update.finality_branch = None;
    update.signature_slot = update.attested_header.slot + 1;

    assert_eq!(
        fixture.verify(&update, 9000),
        Err(ConsensusError::NotRelevant)
    );
}

#[test]
fn rejects_tampered_finality_branch() {
    let fixture = Fixture::new();
    let mut update = fixture.finality_update();

    let mut branch = update.finality_branch.clone().unwrap();
    let mut bytes = branch[2].0;
    bytes[0] ^= 0x01;
    branch[2] = B256::from(bytes);
    update.finality_branch = Some(branch);

    assert_eq!(
        fixture.verify(&update, 9000),
        Err(ConsensusError::InvalidFinalityProof)
    );
}

#[test]
fn rejects_finalized_header_without_branch() {
    let fixture = Fixture::new();
    let mut update = fixture.finality_update();
    update.finality_branch = None;

    assert_eq!(
        fixture.verify(&update, 9000),
        Err(ConsensusError::InvalidFinalityProof)
    );
}

#[test]
fn rejects_unproven_next_committee() {
    let fixture = Fixture::new();
    let mut update = fixture.finality_update();
    update.next_sync_committee = Some(fixture.store.current_sync_committee.clone());
    update.next_sync_committee_branch = Some(branch_of(5));

    assert_eq!(
        fixture.verify(&update, 9000),
        Err(ConsensusError::InvalidNextSyncCommitteeProof)
    );
}

#[test]
fn accepts_proven_next_committee() {
    let fixture = Fixture::new();

    let next_keys = committee_keys_from(8, 1000);
    let next_committee = committee_of(&next_keys);
    let next_branch = branch_of(5);

    // a committee-only update: the attested state root commits to the next
    // committee and the update makes no finality claim
    let state_root = fold_branch(next_committee.tree_hash_root(), &next_branch, 23);
    let mut attested_header = header(8300);
    attested_header.state_root = state_root;
    let signature_slot = attested_header.slot + 1;
    let signature = sign_header(&fixture.keys, &attested_header, signature_slot);

    let update = GenericUpdate {
        attested_header,
        sync_aggregate: SyncAggregate {
            sync_committee_bits: all_bits(),
            sync_committee_signature: signature,
        },
        signature_slot,
        next_sync_committee: Some(next_committee),
        next_sync_committee_branch: Some(next_branch),
        finalized_header: None,
        finality_branch: None,
    };

    assert_eq!(fixture.verify(&update, 9000), Ok(()));
}

#[test]
fn rejects_tampered_signature() {
    let fixture = Fixture::new();
    let mut update = fixture.finality_update();

    let mut bytes = update.sync_aggregate.sync_committee_signature.0;
    bytes[10] ^= 0x01;
    update.sync_aggregate.sync_committee_signature = SignatureBytes::from(bytes);

    assert_eq!(
        fixture.verify(&update, 9000),
        Err(ConsensusError::InvalidSignature)
    );
}

#[test]
fn rejects_signature_by_wrong_committee() {
    let fixture = Fixture::new();
    let mut update = fixture.finality_update();

    let stranger_keys = committee_keys_from(512, 100_000);
    update.sync_aggregate.sync_committee_signature = sign_header(
        &stranger_keys,
        &update.attested_header,
        update.signature_slot,
    );

    assert_eq!(
        fixture.verify(&update, 9000),
        Err(ConsensusError::InvalidSignature)
    );
}

#[test]
fn verifies_next_period_signature_with_next_committee() {
    let mut fixture = Fixture::new();

    let next_keys = committee_keys_from(512, 200_000);
    let next_committee = committee_of(&next_keys);
    fixture.store.next_sync_committee = Some(next_committee);

    // signature lands in period 2, one past the store period
    let finalized_header = header(2 * 8192 + 32);
    let finality_branch = branch_of(6);
    let state_root = fold_branch(finalized_header.tree_hash_root(), &finality_branch, 41);
    let mut attested_header = header(2 * 8192 + 100);
    attested_header.state_root = state_root;
    let signature_slot = attested_header.slot + 1;

    let signature = sign_header(&next_keys, &attested_header, signature_slot);
    let update = GenericUpdate {
        attested_header,
        sync_aggregate: SyncAggregate {
            sync_committee_bits: all_bits(),
            sync_committee_signature: signature,
        },
        signature_slot,
        next_sync_committee: None,
        next_sync_committee_branch: None,
        finalized_header: Some(finalized_header),
        finality_branch: Some(finality_branch),
    };

    assert_eq!(fixture.verify(&update, 3 * 8192), Ok(()));

    // the current committee must not be able to stand in for the next one
    let mut forged = update.clone();
    forged.sync_aggregate.sync_committee_signature = sign_header(
        &fixture.keys,
        &forged.attested_header,
        forged.signature_slot,
    );
    assert_eq!(
        fixture.verify(&forged, 3 * 8192),
        Err(ConsensusError::InvalidSignature)
    );
}

#[test]
fn bootstrap_round_trip() {
    let keys = committee_keys(8);
    let committee = committee_of(&keys);
    let branch = branch_of(5);

    let state_root = fold_branch(committee.tree_hash_root(), &branch, 22);
    let mut bootstrap_header = header(1000);
    bootstrap_header.state_root = state_root;

    let bootstrap = Bootstrap {
        header: bootstrap_header,
        current_sync_committee: committee,
        current_sync_committee_branch: branch,
    };

    let checkpoint = bootstrap.header.tree_hash_root();
    assert_eq!(verify_bootstrap(&bootstrap, checkpoint), Ok(()));

    // a different checkpoint must be rejected
    let result = verify_bootstrap(&bootstrap, B256::repeat_byte(0xca));
    assert!(matches!(
        result,
        Err(ConsensusError::InvalidHeaderHash { .. })
    ));
}

#[test]
fn bootstrap_rejects_invalid_committee_proof() {
    let keys = committee_keys(8);
    let committee = committee_of(&keys);

    let bootstrap = Bootstrap {
        header: header(1000),
        current_sync_committee: committee,
        current_sync_committee_branch: branch_of(5),
    };

    let checkpoint = bootstrap.header.tree_hash_root();
    assert_eq!(
        verify_bootstrap(&bootstrap, checkpoint),
        Err(ConsensusError::InvalidCurrentSyncCommitteeProof)
    );
}
