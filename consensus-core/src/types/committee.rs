use serde::Deserialize;
use ssz_types::typenum::U512;
use ssz_types::{BitVector, FixedVector};
use tree_hash_derive::TreeHash;

use super::{BLSPubKey, SignatureBytes};

#[derive(Debug, Clone, PartialEq, Deserialize, TreeHash)]
pub struct SyncCommittee {
    pub pubkeys: FixedVector<BLSPubKey, U512>,
    pub aggregate_pubkey: BLSPubKey,
}

impl Default for SyncCommittee {
    fn default() -> Self {
        Self {
            pubkeys: Vec::new().into(),
            aggregate_pubkey: BLSPubKey::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, TreeHash)]
pub struct SyncAggregate {
    pub sync_committee_bits: BitVector<U512>,
    pub sync_committee_signature: SignatureBytes,
}

impl Default for SyncAggregate {
    fn default() -> Self {
        Self {
            sync_committee_bits: BitVector::new(),
            sync_committee_signature: SignatureBytes::ZERO,
        }
    }
}
