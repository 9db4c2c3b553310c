use alloy_primitives::B256;
use serde::Deserialize;

use super::committee::{SyncAggregate, SyncCommittee};
use super::header::{header_deserialize, Header};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bootstrap {
    #[serde(deserialize_with = "header_deserialize")]
    pub header: Header,
    pub current_sync_committee: SyncCommittee,
    pub current_sync_committee_branch: Vec<B256>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    #[serde(deserialize_with = "header_deserialize")]
    pub attested_header: Header,
    pub next_sync_committee: SyncCommittee,
    pub next_sync_committee_branch: Vec<B256>,
    #[serde(deserialize_with = "header_deserialize")]
    pub finalized_header: Header,
    pub finality_branch: Vec<B256>,
    pub sync_aggregate: SyncAggregate,
    #[serde(with = "serde_utils::quoted_u64")]
    pub signature_slot: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinalityUpdate {
    #[serde(deserialize_with = "header_deserialize")]
    pub attested_header: Header,
    #[serde(deserialize_with = "header_deserialize")]
    pub finalized_header: Header,
    pub finality_branch: Vec<B256>,
    pub sync_aggregate: SyncAggregate,
    #[serde(with = "serde_utils::quoted_u64")]
    pub signature_slot: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimisticUpdate {
    #[serde(deserialize_with = "header_deserialize")]
    pub attested_header: Header,
    pub sync_aggregate: SyncAggregate,
    #[serde(with = "serde_utils::quoted_u64")]
    pub signature_slot: u64,
}

/// The single shape the verifier and applier work on. Full, finality and
/// optimistic updates all project into it; absent parts stay `None` instead
/// of carrying default-valued placeholders.
#[derive(Debug, Clone, Default)]
pub struct GenericUpdate {
    pub attested_header: Header,
    pub sync_aggregate: SyncAggregate,
    pub signature_slot: u64,
    pub next_sync_committee: Option<SyncCommittee>,
    pub next_sync_committee_branch: Option<Vec<B256>>,
    pub finalized_header: Option<Header>,
    pub finality_branch: Option<Vec<B256>>,
}

impl GenericUpdate {
    pub fn has_sync_update(&self) -> bool {
        self.next_sync_committee.is_some() && self.next_sync_committee_branch.is_some()
    }

    pub fn has_finality_update(&self) -> bool {
        self.finalized_header.is_some() && self.finality_branch.is_some()
    }
}

impl From<&Update> for GenericUpdate {
    fn from(update: &Update) -> Self {
        Self {
            attested_header: update.attested_header,
            sync_aggregate: update.sync_aggregate.clone(),
            signature_slot: update.signature_slot,
            next_sync_committee: default_to_none(update.next_sync_committee.clone()),
            next_sync_committee_branch: default_branch_to_none(&update.next_sync_committee_branch),
            finalized_header: default_header_to_none(update.finalized_header),
            finality_branch: default_branch_to_none(&update.finality_branch),
        }
    }
}

/// Endpoints serve absent parts of a full update as zeroed placeholders;
/// those collapse to `None` so the verifier sees explicit optionality.
fn default_to_none<T: Default + PartialEq>(value: T) -> Option<T> {
    if value == T::default() {
        None
    } else {
        Some(value)
    }
}

fn default_header_to_none(value: Header) -> Option<Header> {
    if value == Header::default() {
        None
    } else {
        Some(value)
    }
}

fn default_branch_to_none(value: &[B256]) -> Option<Vec<B256>> {
    if value.iter().any(|elem| !elem.is_zero()) {
        Some(value.to_vec())
    } else {
        None
    }
}

impl From<&FinalityUpdate> for GenericUpdate {
    fn from(update: &FinalityUpdate) -> Self {
        Self {
            attested_header: update.attested_header,
            sync_aggregate: update.sync_aggregate.clone(),
            signature_slot: update.signature_slot,
            next_sync_committee: None,
            next_sync_committee_branch: None,
            finalized_header: Some(update.finalized_header),
            finality_branch: Some(update.finality_branch.clone()),
        }
    }
}

impl From<&OptimisticUpdate> for GenericUpdate {
    fn from(update: &OptimisticUpdate) -> Self {
        Self {
            attested_header: update.attested_header,
            sync_aggregate: update.sync_aggregate.clone(),
            signature_slot: update.signature_slot,
            next_sync_committee: None,
            next_sync_committee_branch: None,
            finalized_header: None,
            finality_branch: None,
        }
    }
}
