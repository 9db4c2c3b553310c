use std::path::PathBuf;

use alloy_primitives::B256;
use serde::Serialize;

use crate::types::{ChainConfig, Forks};
use crate::Config;

/// The base configuration for a known network.
#[derive(Serialize)]
pub struct BaseConfig {
    pub consensus_rpc: Option<String>,
    pub default_checkpoint: B256,
    pub chain: ChainConfig,
    pub forks: Forks,
    pub max_checkpoint_age: u64,
    pub data_dir: Option<PathBuf>,
    pub load_external_fallback: bool,
    pub strict_checkpoint_age: bool,
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            consensus_rpc: None,
            default_checkpoint: B256::ZERO,
            chain: Default::default(),
            forks: Default::default(),
            max_checkpoint_age: 0,
            data_dir: None,
            load_external_fallback: false,
            strict_checkpoint_age: false,
        }
    }
}

impl From<BaseConfig> for Config {
    fn from(base: BaseConfig) -> Self {
        Config {
            consensus_rpc: base.consensus_rpc.unwrap_or_default(),
            default_checkpoint: base.default_checkpoint,
            checkpoint: None,
            data_dir: base.data_dir,
            chain: base.chain,
            forks: base.forks,
            max_checkpoint_age: base.max_checkpoint_age,
            fallback: None,
            load_external_fallback: base.load_external_fallback,
            strict_checkpoint_age: base.strict_checkpoint_age,
        }
    }
}
