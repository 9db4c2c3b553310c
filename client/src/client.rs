use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::B256;
use eyre::{eyre, Result};
use tracing::{info, warn};

use common::types::{Block, BlockTag};
use config::networks::Network;
use config::Config;
use consensus::rpc::nimbus_rpc::NimbusRpc;

use crate::database::Database;
use crate::node::Node;

#[derive(Default)]
pub struct ClientBuilder {
    network: Option<Network>,
    consensus_rpc: Option<String>,
    checkpoint: Option<B256>,
    data_dir: Option<PathBuf>,
    config: Option<Config>,
    fallback: Option<String>,
    load_external_fallback: bool,
    strict_checkpoint_age: bool,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    pub fn consensus_rpc(mut self, consensus_rpc: &str) -> Self {
        self.consensus_rpc = Some(consensus_rpc.to_string());
        self
    }

    pub fn checkpoint(mut self, checkpoint: B256) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = Some(data_dir);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn fallback(mut self, fallback: &str) -> Self {
        self.fallback = Some(fallback.to_string());
        self
    }

    pub fn load_external_fallback(mut self) -> Self {
        self.load_external_fallback = true;
        self
    }

    pub fn strict_checkpoint_age(mut self) -> Self {
        self.strict_checkpoint_age = true;
        self
    }

    pub fn build<DB: Database>(self) -> Result<Client<DB>> {
        let base_config = if let Some(network) = self.network {
            network.to_base_config()
        } else {
            let config = self
                .config
                .as_ref()
                .ok_or(eyre!("missing network config"))?;
            config.to_base_config()
        };

        let consensus_rpc = if let Some(consensus_rpc) = self.consensus_rpc {
            consensus_rpc
        } else if let Some(config) = &self.config {
            config.consensus_rpc.clone()
        } else {
            base_config
                .consensus_rpc
                .clone()
                .ok_or(eyre!("missing consensus rpc"))?
        };

        let checkpoint = if let Some(checkpoint) = self.checkpoint {
            Some(checkpoint)
        } else if let Some(config) = &self.config {
            config.checkpoint
        } else {
            None
        };

        let default_checkpoint = if let Some(config) = &self.config {
            config.default_checkpoint
        } else {
            base_config.default_checkpoint
        };

        let data_dir = if self.data_dir.is_some() {
            self.data_dir
        } else if let Some(config) = &self.config {
            config.data_dir.clone()
        } else {
            None
        };

        let fallback = if self.fallback.is_some() {
            self.fallback
        } else if let Some(config) = &self.config {
            config.fallback.clone()
        } else {
            None
        };

        let load_external_fallback = if let Some(config) = &self.config {
            self.load_external_fallback || config.load_external_fallback
        } else {
            self.load_external_fallback
        };

        let strict_checkpoint_age = if let Some(config) = &self.config {
            self.strict_checkpoint_age || config.strict_checkpoint_age
        } else {
            self.strict_checkpoint_age
        };

        let config = Config {
            consensus_rpc,
            default_checkpoint,
            checkpoint,
            data_dir,
            chain: base_config.chain,
            forks: base_config.forks,
            max_checkpoint_age: base_config.max_checkpoint_age,
            fallback,
            load_external_fallback,
            strict_checkpoint_age,
        };

        Client::new(config)
    }
}

pub struct Client<DB: Database> {
    node: Node<NimbusRpc>,
    db: DB,
}

impl<DB: Database> Client<DB> {
    fn new(mut config: Config) -> Result<Self> {
        let db = DB::new(&config)?;
        if config.checkpoint.is_none() {
            config.checkpoint = db.load_checkpoint().ok();
        }

        let node = Node::new(Arc::new(config));

        Ok(Client { node, db })
    }

    pub async fn shutdown(&self) {
        info!(target: "lucerna::client", "shutting down");

        if let Some(checkpoint) = self.node.get_last_checkpoint().await {
            info!(target: "lucerna::client", "saving last checkpoint hash");
            if self.db.save_checkpoint(checkpoint).is_err() {
                warn!(target: "lucerna::client", "checkpoint save failed");
            }
        }

        self.node.shutdown();
    }

    pub async fn get_block(&self, block: BlockTag) -> Result<Block> {
        self.node.get_block(block).await.map_err(|err| err.into())
    }

    pub async fn get_block_number(&self) -> Result<u64> {
        self.node.get_block_number().await.map_err(|err| err.into())
    }

    pub fn chain_id(&self) -> u64 {
        self.node.chain_id()
    }

    pub async fn get_last_checkpoint(&self) -> Option<String> {
        self.node
            .get_last_checkpoint()
            .await
            .map(|checkpoint| format!("0x{}", hex::encode(checkpoint)))
    }

    pub async fn syncing(&self) -> bool {
        self.node.syncing().await
    }

    pub fn expected_current_slot(&self) -> u64 {
        self.node.consensus.expected_current_slot()
    }
}
