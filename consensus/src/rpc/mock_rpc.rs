use std::collections::HashMap;

use alloy_primitives::B256;
use async_trait::async_trait;
use eyre::{eyre, Result};

use consensus_core::types::{BeaconBlock, Bootstrap, FinalityUpdate, OptimisticUpdate, Update};
use consensus_core::utils::calc_sync_period;

use super::ConsensusRpc;

/// An in-memory consensus RPC primed with canned responses. Tests construct
/// it directly and hand it to the driver.
#[derive(Debug, Default)]
pub struct MockRpc {
    pub chain_id: u64,
    pub bootstrap: Option<Bootstrap>,
    pub updates: Vec<Update>,
    pub finality_update: Option<FinalityUpdate>,
    pub optimistic_update: Option<OptimisticUpdate>,
    pub blocks: HashMap<u64, BeaconBlock>,
}

#[async_trait]
impl ConsensusRpc for MockRpc {
    fn new(_path: &str) -> Self {
        MockRpc::default()
    }

    async fn get_bootstrap(&self, _block_root: B256) -> Result<Bootstrap> {
        self.bootstrap
            .clone()
            .ok_or_else(|| eyre!("bootstrap not found"))
    }

    async fn get_updates(&self, period: u64, count: u8) -> Result<Vec<Update>> {
        Ok(self
            .updates
            .iter()
            .filter(|update| calc_sync_period(update.signature_slot) >= period)
            .take(count as usize)
            .cloned()
            .collect())
    }

    async fn get_finality_update(&self) -> Result<FinalityUpdate> {
        self.finality_update
            .clone()
            .ok_or_else(|| eyre!("finality update not found"))
    }

    async fn get_optimistic_update(&self) -> Result<OptimisticUpdate> {
        self.optimistic_update
            .clone()
            .ok_or_else(|| eyre!("optimistic update not found"))
    }

    async fn get_block(&self, slot: u64) -> Result<BeaconBlock> {
        self.blocks
            .get(&slot)
            .cloned()
            .ok_or_else(|| eyre!("block not found for slot {slot}"))
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }
}
