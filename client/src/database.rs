use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use alloy_primitives::B256;
use eyre::Result;

use config::Config;

/// Persists the most recent trustable checkpoint between runs.
pub trait Database: Clone + Send + Sync + 'static {
    fn new(config: &Config) -> Result<Self>
    where
        Self: Sized;
    fn save_checkpoint(&self, checkpoint: B256) -> Result<()>;
    fn load_checkpoint(&self) -> Result<B256>;
}

/// Stores the checkpoint as a hex string under the configured data dir.
#[derive(Clone)]
pub struct FileDB {
    data_dir: PathBuf,
}

impl Database for FileDB {
    fn new(config: &Config) -> Result<Self> {
        if let Some(data_dir) = &config.data_dir {
            return Ok(FileDB {
                data_dir: data_dir.clone(),
            });
        }

        eyre::bail!("data dir not in config")
    }

    fn save_checkpoint(&self, checkpoint: B256) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::write(self.data_dir.join("checkpoint"), hex::encode(checkpoint))?;

        Ok(())
    }

    fn load_checkpoint(&self) -> Result<B256> {
        let checkpoint = fs::read_to_string(self.data_dir.join("checkpoint"))?;
        Ok(B256::from_str(checkpoint.trim())?)
    }
}

/// Falls back to the configured checkpoint and never persists anything.
#[derive(Clone)]
pub struct ConfigDB {
    checkpoint: B256,
}

impl Database for ConfigDB {
    fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            checkpoint: config.checkpoint.unwrap_or(config.default_checkpoint),
        })
    }

    fn save_checkpoint(&self, _checkpoint: B256) -> Result<()> {
        Ok(())
    }

    fn load_checkpoint(&self) -> Result<B256> {
        Ok(self.checkpoint)
    }
}
