use std::path::PathBuf;

use alloy_primitives::B256;
use serde::Deserialize;

pub mod base;
pub mod checkpoints;
pub mod networks;
pub mod types;

pub use base::BaseConfig;
pub use checkpoints::CheckpointFallback;
pub use types::{ChainConfig, Fork, Forks};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    pub consensus_rpc: String,
    pub default_checkpoint: B256,
    pub checkpoint: Option<B256>,
    pub data_dir: Option<PathBuf>,
    pub chain: ChainConfig,
    pub forks: Forks,
    pub max_checkpoint_age: u64,
    pub fallback: Option<String>,
    pub load_external_fallback: bool,
    pub strict_checkpoint_age: bool,
}

impl Config {
    pub fn to_base_config(&self) -> BaseConfig {
        BaseConfig {
            consensus_rpc: Some(self.consensus_rpc.clone()),
            default_checkpoint: self.default_checkpoint,
            chain: self.chain.clone(),
            forks: self.forks,
            max_checkpoint_age: self.max_checkpoint_age,
            data_dir: self.data_dir.clone(),
            load_external_fallback: self.load_external_fallback,
            strict_checkpoint_age: self.strict_checkpoint_age,
        }
    }
}
