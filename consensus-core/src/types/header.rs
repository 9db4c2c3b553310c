use alloy_primitives::B256;
use serde::{Deserialize, Deserializer, Serialize};
use tree_hash_derive::TreeHash;

use super::SignatureBytes;

/// A beacon block header. The tree hash root of the five fields is the
/// canonical identity of the block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TreeHash)]
pub struct Header {
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub proposer_index: u64,
    pub parent_root: B256,
    pub state_root: B256,
    pub body_root: B256,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, TreeHash)]
pub struct SignedBeaconBlockHeader {
    pub message: Header,
    pub signature: SignatureBytes,
}

/// Unwraps the Capella-style light client header (`{"beacon": {...}}`) that
/// the Beacon API serves, keeping only the beacon header the protocol needs.
pub(crate) fn header_deserialize<'de, D>(deserializer: D) -> Result<Header, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct LightClientHeader {
        beacon: Header,
    }

    Ok(LightClientHeader::deserialize(deserializer)?.beacon)
}
