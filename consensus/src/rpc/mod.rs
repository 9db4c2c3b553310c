use alloy_primitives::B256;
use async_trait::async_trait;
use eyre::Result;

use consensus_core::types::{BeaconBlock, Bootstrap, FinalityUpdate, OptimisticUpdate, Update};

pub mod mock_rpc;
pub mod nimbus_rpc;

/// The consensus layer endpoints the light client consumes. All operations
/// are fallible with a transport error.
#[async_trait]
pub trait ConsensusRpc: Send + Sync + 'static {
    fn new(path: &str) -> Self
    where
        Self: Sized;
    async fn get_bootstrap(&self, block_root: B256) -> Result<Bootstrap>;
    async fn get_updates(&self, period: u64, count: u8) -> Result<Vec<Update>>;
    async fn get_finality_update(&self) -> Result<FinalityUpdate>;
    async fn get_optimistic_update(&self) -> Result<OptimisticUpdate>;
    async fn get_block(&self, slot: u64) -> Result<BeaconBlock>;
    async fn chain_id(&self) -> Result<u64>;
}
