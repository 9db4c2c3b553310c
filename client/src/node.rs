use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::B256;
use eyre::Result;

use common::errors::BlockNotFoundError;
use common::types::{Block, BlockTag};
use config::Config;
use consensus::rpc::ConsensusRpc;
use consensus::ConsensusClient;

use crate::errors::NodeError;
use crate::state::State;

/// Wires the consensus driver to a queryable block history.
pub struct Node<R: ConsensusRpc> {
    pub consensus: ConsensusClient<R>,
    pub config: Arc<Config>,
    state: State,
}

impl<R: ConsensusRpc> Node<R> {
    pub fn new(config: Arc<Config>) -> Self {
        let mut consensus = ConsensusClient::new(&config.consensus_rpc, config.clone());

        let block_recv = consensus.block_recv.take().unwrap();
        let finalized_block_recv = consensus.finalized_block_recv.take().unwrap();
        let checkpoint_recv = consensus.checkpoint_recv.take().unwrap();

        let state = State::new(block_recv, finalized_block_recv, checkpoint_recv, 256);

        Node {
            consensus,
            config,
            state,
        }
    }

    pub async fn get_block(&self, tag: BlockTag) -> Result<Block, NodeError> {
        self.check_blocktag_age(&tag).await?;

        self.state
            .get_block(tag)
            .await
            .ok_or_else(|| BlockNotFoundError::new(tag).into())
    }

    pub async fn get_block_number(&self) -> Result<u64, NodeError> {
        self.check_head_age().await?;

        self.state
            .latest_block_number()
            .await
            .ok_or_else(|| BlockNotFoundError::new(BlockTag::Latest).into())
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain.chain_id
    }

    pub async fn get_last_checkpoint(&self) -> Option<B256> {
        self.state.get_last_checkpoint().await
    }

    pub async fn syncing(&self) -> bool {
        self.check_head_age().await.is_err()
    }

    pub fn shutdown(&self) {
        self.consensus.shutdown();
    }

    async fn check_head_age(&self) -> Result<(), NodeError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| panic!("unreachable"))
            .as_secs();

        let block_timestamp = self
            .state
            .get_block(BlockTag::Latest)
            .await
            .ok_or_else(|| NodeError::OutOfSync(now))?
            .timestamp;

        let delay = now.checked_sub(block_timestamp).unwrap_or_default();
        if delay > 60 {
            return Err(NodeError::OutOfSync(delay));
        }

        Ok(())
    }

    async fn check_blocktag_age(&self, block: &BlockTag) -> Result<(), NodeError> {
        match block {
            BlockTag::Latest => self.check_head_age().await,
            BlockTag::Finalized => Ok(()),
            BlockTag::Number(_) => Ok(()),
        }
    }
}
