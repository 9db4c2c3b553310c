use alloy_primitives::{aliases::B32, B256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub genesis_time: u64,
    pub genesis_root: B256,
}

/// The scheduled forks of a beacon chain, ordered by activation epoch.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct Forks {
    pub genesis: Fork,
    pub altair: Fork,
    pub bellatrix: Fork,
    pub capella: Fork,
    pub deneb: Fork,
}

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct Fork {
    pub epoch: u64,
    pub fork_version: B32,
}
