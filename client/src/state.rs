use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::B256;
use tokio::sync::mpsc::Receiver;
use tokio::sync::RwLock;

use common::types::{Block, BlockTag};

/// Consumes the driver's output channels into a bounded block history.
#[derive(Clone)]
pub struct State {
    inner: Arc<RwLock<Inner>>,
}

impl State {
    pub fn new(
        mut block_recv: Receiver<Block>,
        mut finalized_block_recv: Receiver<Block>,
        mut checkpoint_recv: Receiver<B256>,
        history_length: usize,
    ) -> Self {
        let inner = Arc::new(RwLock::new(Inner::new(history_length)));
        let inner_ref = inner.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(block) = block_recv.recv() => {
                        inner_ref.write().await.push_block(block);
                    }
                    Some(block) = finalized_block_recv.recv() => {
                        inner_ref.write().await.push_finalized_block(block);
                    }
                    Some(checkpoint) = checkpoint_recv.recv() => {
                        inner_ref.write().await.last_checkpoint = Some(checkpoint);
                    }
                    else => break,
                }
            }
        });

        State { inner }
    }

    pub async fn get_block(&self, tag: BlockTag) -> Option<Block> {
        let inner = self.inner.read().await;
        match tag {
            BlockTag::Latest => inner.blocks.last_key_value().map(|entry| entry.1.clone()),
            BlockTag::Finalized => inner
                .finalized_blocks
                .last_key_value()
                .map(|entry| entry.1.clone()),
            BlockTag::Number(number) => inner.blocks.get(&number).cloned(),
        }
    }

    pub async fn latest_block_number(&self) -> Option<u64> {
        let inner = self.inner.read().await;
        inner.blocks.last_key_value().map(|entry| *entry.0)
    }

    pub async fn get_last_checkpoint(&self) -> Option<B256> {
        self.inner.read().await.last_checkpoint
    }
}

struct Inner {
    blocks: BTreeMap<u64, Block>,
    finalized_blocks: BTreeMap<u64, Block>,
    last_checkpoint: Option<B256>,
    history_length: usize,
}

impl Inner {
    fn new(history_length: usize) -> Self {
        Self {
            blocks: BTreeMap::new(),
            finalized_blocks: BTreeMap::new(),
            last_checkpoint: None,
            history_length,
        }
    }

    fn push_block(&mut self, block: Block) {
        self.blocks.insert(block.number, block);

        while self.blocks.len() > self.history_length {
            self.blocks.pop_first();
        }
    }

    fn push_finalized_block(&mut self, block: Block) {
        self.blocks.insert(block.number, block.clone());
        self.finalized_blocks.insert(block.number, block);

        // finality only moves on epoch boundaries, so one block per epoch of
        // history is enough
        while self.finalized_blocks.len() > usize::max(self.history_length / 32, 1) {
            self.finalized_blocks.pop_first();
        }
    }
}
