use std::collections::HashMap;

use alloy_primitives::B256;
use eyre::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::networks;

/// The location where the list of checkpoint services are stored.
pub const CHECKPOINT_SYNC_SERVICES_LIST: &str = "https://raw.githubusercontent.com/ethpandaops/checkpoint-sync-health-checks/master/_data/endpoints.yaml";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSlotResponse {
    pub data: RawSlotResponseData,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSlotResponseData {
    pub slots: Vec<Slot>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub slot: u64,
    pub block_root: Option<B256>,
    pub state_root: Option<B256>,
    pub epoch: u64,
    pub time: StartEndTime,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartEndTime {
    /// An ISO 8601 formatted UTC timestamp.
    pub start_time: String,
    /// An ISO 8601 formatted UTC timestamp.
    pub end_time: String,
}

/// A health check for the checkpoint sync service.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// If the node is healthy.
    pub result: bool,
    /// An [ISO 8601](https://en.wikipedia.org/wiki/ISO_8601) UTC timestamp.
    pub date: String,
}

/// A checkpoint fallback service.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointFallbackService {
    /// The endpoint for the checkpoint sync service.
    pub endpoint: String,
    /// The checkpoint sync service name.
    pub name: String,
    /// The service state.
    pub state: bool,
    /// If the service is verified.
    pub verification: bool,
    /// Contact information for the service maintainers.
    pub contacts: Option<serde_yaml::Value>,
    /// Service Notes
    pub notes: Option<serde_yaml::Value>,
    /// The service health check.
    pub health: Vec<Health>,
}

/// The CheckpointFallback manages checkpoint fallback services.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointFallback {
    /// Services Map
    pub services: HashMap<networks::Network, Vec<CheckpointFallbackService>>,
    /// A list of supported networks to build.
    /// Default: [mainnet, sepolia, holesky]
    pub networks: Vec<networks::Network>,
}

impl CheckpointFallback {
    /// Constructs a new checkpoint fallback service.
    pub fn new() -> Self {
        Self {
            services: Default::default(),
            networks: [
                networks::Network::Mainnet,
                networks::Network::Sepolia,
                networks::Network::Holesky,
            ]
            .to_vec(),
        }
    }

    /// Build the checkpoint fallback service from the community-maintained list by [ethPandaOps](https://github.com/ethpandaops).
    ///
    /// The list is defined in [ethPandaOps/checkpoint-fallback-service](https://github.com/ethpandaops/checkpoint-sync-health-checks/blob/master/_data/endpoints.yaml).
    pub async fn build(mut self) -> Result<Self> {
        // Fetch the services
        let res = reqwest::get(CHECKPOINT_SYNC_SERVICES_LIST).await?;
        let yaml = res.text().await?;

        // Parse the yaml content results.
        let list: serde_yaml::Value = serde_yaml::from_str(&yaml)?;

        // Construct the services mapping from network <> list of services
        let mut services = HashMap::new();
        for network in &self.networks {
            // Try to parse list of checkpoint fallback services
            let service_list = list.get(network.to_string()).ok_or_else(|| {
                eyre::eyre!(format!("missing {network} fallback checkpoint services"))
            })?;
            let parsed: Vec<CheckpointFallbackService> =
                serde_yaml::from_value(service_list.clone())?;
            services.insert(*network, parsed);
        }
        self.services = services;

        Ok(self)
    }

    /// Fetch the latest checkpoint from the healthy checkpoint fallback services.
    ///
    /// All healthy services are queried concurrently and the checkpoint seen
    /// by the most services wins, so a single lagging or malicious service
    /// cannot steer the selection on its own.
    pub async fn fetch_latest_checkpoint(&self, network: &networks::Network) -> Result<B256> {
        let endpoints = self.get_healthy_fallback_endpoints(network);
        if endpoints.is_empty() {
            return Err(eyre::eyre!("no healthy checkpoint fallback services"));
        }

        let responses = join_all(
            endpoints
                .iter()
                .map(|endpoint| async move { Self::query_service(endpoint).await }),
        )
        .await;

        let mut tally: HashMap<B256, usize> = HashMap::new();
        for res in responses.into_iter().flatten() {
            let checkpoint = res
                .data
                .slots
                .iter()
                .find_map(|slot| slot.block_root.filter(|_| slot.slot % 32 == 0));

            if let Some(checkpoint) = checkpoint {
                *tally.entry(checkpoint).or_default() += 1;
            }
        }

        tally
            .into_iter()
            .max_by_key(|(_, votes)| *votes)
            .map(|(checkpoint, _)| checkpoint)
            .ok_or_else(|| eyre::eyre!("no checkpoint found from fallback services"))
    }

    /// Fetch the latest checkpoint from an explicitly configured checkpoint
    /// sync service api.
    pub async fn fetch_checkpoint_from_api(url: &str) -> Result<B256> {
        let constructed_url = Self::construct_url(url);

        let res = reqwest::get(&constructed_url).await?;
        let raw: RawSlotResponse = res.json().await?;
        let slot = raw
            .data
            .slots
            .first()
            .ok_or_else(|| eyre::eyre!("no slots returned from {url}"))?;

        slot.block_root
            .ok_or_else(|| eyre::eyre!("no checkpoint in latest slot from {url}"))
    }

    async fn query_service(endpoint: &str) -> Option<RawSlotResponse> {
        let url = Self::construct_url(endpoint);
        let res = reqwest::get(&url).await.ok()?;
        res.json().await.ok()
    }

    pub fn construct_url(endpoint: &str) -> String {
        format!("{endpoint}/checkpointz/v1/beacon/slots")
    }

    /// Returns a list of all checkpoint fallback endpoints.
    ///
    /// ### Warning
    ///
    /// These services are not healthchecked **nor** trustworthy and may act with malice by returning invalid checkpoints.
    pub fn get_all_fallback_endpoints(&self, network: &networks::Network) -> Vec<String> {
        self.services[network]
            .iter()
            .map(|service| service.endpoint.clone())
            .collect()
    }

    /// Returns a list of healthchecked checkpoint fallback endpoints.
    ///
    /// ### Warning
    ///
    /// These services are not trustworthy and may act with malice by returning invalid checkpoints.
    pub fn get_healthy_fallback_endpoints(&self, network: &networks::Network) -> Vec<String> {
        self.services[network]
            .iter()
            .filter(|service| service.state)
            .map(|service| service.endpoint.clone())
            .collect()
    }

    /// Returns a list of healthchecked checkpoint fallback services.
    ///
    /// ### Warning
    ///
    /// These services are not trustworthy and may act with malice by returning invalid checkpoints.
    pub fn get_healthy_fallback_services(
        &self,
        network: &networks::Network,
    ) -> Vec<CheckpointFallbackService> {
        self.services[network]
            .iter()
            .filter(|service| service.state)
            .cloned()
            .collect::<Vec<CheckpointFallbackService>>()
    }

    /// Returns the raw checkpoint fallback service objects for a given network.
    pub fn get_fallback_services(
        &self,
        network: &networks::Network,
    ) -> &Vec<CheckpointFallbackService> {
        self.services[network].as_ref()
    }
}
