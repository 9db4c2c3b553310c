use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy_primitives::B256;
use eyre::Result;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use tree_hash::TreeHash;

use common::types::Block;
use config::networks::Network;
use config::{CheckpointFallback, Config};
use consensus_core::apply::{
    apply_bootstrap, apply_finality_update, apply_optimistic_update, apply_update,
};
use consensus_core::constants::{MAX_REQUEST_LIGHT_CLIENT_UPDATES, SYNC_COMMITTEE_SIZE};
use consensus_core::errors::ConsensusError;
use consensus_core::types::{
    ExecutionPayload, FinalityUpdate, LightClientStore, OptimisticUpdate, Update,
};
use consensus_core::utils::{calc_sync_period, expected_current_slot, get_bits};
use consensus_core::verify::{
    verify_bootstrap, verify_finality_update, verify_optimistic_update, verify_update,
};
use execution::payload_to_block;

use crate::rpc::ConsensusRpc;

/// The driver half of the light client. Spawns a task that bootstraps from
/// the configured checkpoint, catches up period by period, then advances
/// once per slot, emitting verified execution blocks and fresh checkpoints
/// on the output channels.
pub struct ConsensusClient<R: ConsensusRpc> {
    pub block_recv: Option<Receiver<Block>>,
    pub finalized_block_recv: Option<Receiver<Block>>,
    pub checkpoint_recv: Option<Receiver<B256>>,
    genesis_time: u64,
    shutdown_send: watch::Sender<bool>,
    phantom: PhantomData<R>,
}

impl<R: ConsensusRpc> ConsensusClient<R> {
    /// Starts the driver. Must be called from within a tokio runtime.
    pub fn new(rpc: &str, config: Arc<Config>) -> ConsensusClient<R> {
        let (block_send, block_recv) = channel(256);
        let (finalized_block_send, finalized_block_recv) = channel(1);
        let (checkpoint_send, checkpoint_recv) = channel(1);
        let (shutdown_send, mut shutdown_recv) = watch::channel(false);

        let genesis_time = config.chain.genesis_time;
        let initial_checkpoint = config.checkpoint.unwrap_or(config.default_checkpoint);

        let mut inner = Inner::<R>::new(
            R::new(rpc),
            block_send,
            finalized_block_send,
            checkpoint_send,
            config,
        );

        tokio::spawn(async move {
            let res = inner.sync(initial_checkpoint).await;
            if let Err(err) = res {
                let config = inner.config.clone();
                if config.load_external_fallback {
                    let res = sync_all_fallbacks(&mut inner, config.chain.chain_id).await;
                    if let Err(err) = res {
                        error!(target: "lucerna::consensus", err = %err, "sync failed");
                        return;
                    }
                } else if let Some(fallback) = &config.fallback {
                    let res = sync_fallback(&mut inner, fallback).await;
                    if let Err(err) = res {
                        error!(target: "lucerna::consensus", err = %err, "sync failed");
                        return;
                    }
                } else {
                    error!(target: "lucerna::consensus", err = %err, "sync failed");
                    return;
                }
            }

            if let Err(err) = inner.send_blocks().await {
                warn!(target: "lucerna::consensus", err = %err, "send error");
            }

            loop {
                tokio::select! {
                    _ = shutdown_recv.changed() => {
                        info!(target: "lucerna::consensus", "shutting down");
                        break;
                    }
                    _ = sleep(inner.duration_until_next_update()) => {
                        if let Err(err) = inner.advance().await {
                            warn!(target: "lucerna::consensus", err = %err, "advance error");
                            continue;
                        }

                        if let Err(err) = inner.send_blocks().await {
                            warn!(target: "lucerna::consensus", err = %err, "send error");
                        }
                    }
                }
            }
        });

        ConsensusClient {
            block_recv: Some(block_recv),
            finalized_block_recv: Some(finalized_block_recv),
            checkpoint_recv: Some(checkpoint_recv),
            genesis_time,
            shutdown_send,
            phantom: PhantomData,
        }
    }

    /// Signals the driver to stop at its next suspension point.
    pub fn shutdown(&self) {
        let _ = self.shutdown_send.send(true);
    }

    pub fn expected_current_slot(&self) -> u64 {
        expected_current_slot(SystemTime::now(), self.genesis_time)
    }
}

async fn sync_fallback<R: ConsensusRpc>(inner: &mut Inner<R>, fallback: &str) -> Result<()> {
    let checkpoint = CheckpointFallback::fetch_checkpoint_from_api(fallback).await?;
    inner.sync(checkpoint).await
}

async fn sync_all_fallbacks<R: ConsensusRpc>(inner: &mut Inner<R>, chain_id: u64) -> Result<()> {
    let network = Network::from_chain_id(chain_id)?;
    let checkpoint = CheckpointFallback::new()
        .build()
        .await?
        .fetch_latest_checkpoint(&network)
        .await?;

    inner.sync(checkpoint).await
}

/// Owns the store exclusively. The verifier reads it, the applier mutates
/// it, and nothing else touches it.
pub struct Inner<R: ConsensusRpc> {
    pub rpc: R,
    pub store: LightClientStore,
    last_checkpoint: Option<B256>,
    block_send: Sender<Block>,
    finalized_block_send: Sender<Block>,
    checkpoint_send: Sender<B256>,
    pub config: Arc<Config>,
}

impl<R: ConsensusRpc> Inner<R> {
    pub fn new(
        rpc: R,
        block_send: Sender<Block>,
        finalized_block_send: Sender<Block>,
        checkpoint_send: Sender<B256>,
        config: Arc<Config>,
    ) -> Inner<R> {
        Inner {
            rpc,
            store: LightClientStore::default(),
            last_checkpoint: None,
            block_send,
            finalized_block_send,
            checkpoint_send,
            config,
        }
    }

    pub async fn check_rpc(&self) -> Result<()> {
        let chain_id = self.rpc.chain_id().await?;

        if chain_id != self.config.chain.chain_id {
            Err(ConsensusError::IncorrectRpcNetwork.into())
        } else {
            Ok(())
        }
    }

    /// Fetches the beacon block for a slot and extracts its execution
    /// payload after checking the body against the matching verified header.
    pub async fn get_execution_payload(&self, slot: &Option<u64>) -> Result<ExecutionPayload> {
        let slot = slot.unwrap_or(self.store.optimistic_header.slot);
        let block = self.rpc.get_block(slot).await?;
        let body_root = block.body.tree_hash_root();

        let latest_slot = self.store.optimistic_header.slot;
        let finalized_slot = self.store.finalized_header.slot;

        let verified_body_root = if slot == latest_slot {
            self.store.optimistic_header.body_root
        } else if slot == finalized_slot {
            self.store.finalized_header.body_root
        } else {
            return Err(ConsensusError::PayloadNotFound(slot).into());
        };

        if verified_body_root != body_root {
            return Err(ConsensusError::InvalidHeaderHash {
                expected: verified_body_root,
                found: body_root,
            }
            .into());
        }

        Ok(block.body.execution_payload)
    }

    pub async fn sync(&mut self, checkpoint: B256) -> Result<()> {
        self.store = LightClientStore::default();
        self.last_checkpoint = None;

        self.check_rpc().await?;
        self.bootstrap(checkpoint).await?;

        let current_period = calc_sync_period(self.store.finalized_header.slot);
        let updates = self
            .rpc
            .get_updates(current_period, MAX_REQUEST_LIGHT_CLIENT_UPDATES)
            .await?;

        for update in updates {
            self.verify_update(&update)?;
            self.apply_update(&update);
        }

        let finality_update = self.rpc.get_finality_update().await?;
        self.verify_finality_update(&finality_update)?;
        self.apply_finality_update(&finality_update);

        let optimistic_update = self.rpc.get_optimistic_update().await?;
        self.verify_optimistic_update(&optimistic_update)?;
        self.apply_optimistic_update(&optimistic_update);

        info!(
            target: "lucerna::consensus",
            "in sync with checkpoint: 0x{}",
            hex::encode(checkpoint)
        );

        Ok(())
    }

    pub async fn advance(&mut self) -> Result<()> {
        let finality_update = self.rpc.get_finality_update().await?;
        self.verify_finality_update(&finality_update)?;
        self.apply_finality_update(&finality_update);

        let optimistic_update = self.rpc.get_optimistic_update().await?;
        self.verify_optimistic_update(&optimistic_update)?;
        self.apply_optimistic_update(&optimistic_update);

        if self.store.next_sync_committee.is_none() {
            debug!(target: "lucerna::consensus", "checking for sync committee update");

            let current_period = calc_sync_period(self.store.finalized_header.slot);
            let updates = self.rpc.get_updates(current_period, 1).await?;

            if updates.len() == 1 {
                let update = &updates[0];
                match self.verify_update(update) {
                    Ok(()) => {
                        info!(target: "lucerna::consensus", "updating sync committee");
                        self.apply_update(update);
                    }
                    Err(err) => {
                        debug!(target: "lucerna::consensus", err = %err, "sync committee update rejected");
                    }
                }
            }
        }

        Ok(())
    }

    /// Emits the optimistic block, the finalized block, and any freshly
    /// derived checkpoint on the output channels. Bounded channels throttle
    /// the advance loop when downstream lags.
    pub async fn send_blocks(&mut self) -> Result<()> {
        let latest_slot = self.store.optimistic_header.slot;
        let payload = self.get_execution_payload(&Some(latest_slot)).await?;

        let finalized_slot = self.store.finalized_header.slot;
        let finalized_payload = self.get_execution_payload(&Some(finalized_slot)).await?;

        self.block_send.send(payload_to_block(&payload)?).await?;
        self.finalized_block_send
            .send(payload_to_block(&finalized_payload)?)
            .await?;

        if let Some(checkpoint) = self.last_checkpoint.take() {
            self.checkpoint_send.send(checkpoint).await?;
        }

        Ok(())
    }

    /// Updates are scheduled for 4 seconds into the next slot.
    pub fn duration_until_next_update(&self) -> Duration {
        let current_slot = self.expected_current_slot();
        let next_slot = current_slot + 1;
        let next_slot_timestamp = self.slot_timestamp(next_slot);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| panic!("unreachable"))
            .as_secs();

        let time_to_next_slot = next_slot_timestamp.saturating_sub(now);
        let next_update = time_to_next_slot + 4;

        Duration::from_secs(next_update)
    }

    pub async fn bootstrap(&mut self, checkpoint: B256) -> Result<()> {
        let bootstrap = self
            .rpc
            .get_bootstrap(checkpoint)
            .await
            .map_err(|err| ConsensusError::BootstrapFetchFailed(err.to_string()))?;

        let is_valid = self.is_valid_checkpoint(bootstrap.header.slot);
        if !is_valid {
            if self.config.strict_checkpoint_age {
                return Err(ConsensusError::CheckpointTooOld.into());
            } else {
                warn!(
                    target: "lucerna::consensus",
                    "checkpoint too old, consider using a more recent block"
                );
            }
        }

        verify_bootstrap(&bootstrap, checkpoint)?;
        apply_bootstrap(&mut self.store, &bootstrap);

        Ok(())
    }

    pub fn verify_update(&self, update: &Update) -> Result<()> {
        verify_update(
            update,
            self.expected_current_slot(),
            &self.store,
            self.config.chain.genesis_root,
            &self.config.forks,
        )
        .map_err(|err| err.into())
    }

    fn verify_finality_update(&self, update: &FinalityUpdate) -> Result<()> {
        verify_finality_update(
            update,
            self.expected_current_slot(),
            &self.store,
            self.config.chain.genesis_root,
            &self.config.forks,
        )
        .map_err(|err| err.into())
    }

    fn verify_optimistic_update(&self, update: &OptimisticUpdate) -> Result<()> {
        verify_optimistic_update(
            update,
            self.expected_current_slot(),
            &self.store,
            self.config.chain.genesis_root,
            &self.config.forks,
        )
        .map_err(|err| err.into())
    }

    pub fn apply_update(&mut self, update: &Update) {
        let new_checkpoint = apply_update(&mut self.store, update);
        if new_checkpoint.is_some() {
            self.last_checkpoint = new_checkpoint;
        }
    }

    fn apply_finality_update(&mut self, update: &FinalityUpdate) {
        let prev_finalized_slot = self.store.finalized_header.slot;
        let prev_optimistic_slot = self.store.optimistic_header.slot;

        let new_checkpoint = apply_finality_update(&mut self.store, update);
        if new_checkpoint.is_some() {
            self.last_checkpoint = new_checkpoint;
        }

        let bits = get_bits(&update.sync_aggregate.sync_committee_bits);
        if self.store.finalized_header.slot != prev_finalized_slot {
            self.log_finality_update(bits);
        }
        if self.store.optimistic_header.slot != prev_optimistic_slot {
            self.log_optimistic_update(bits);
        }
    }

    fn apply_optimistic_update(&mut self, update: &OptimisticUpdate) {
        let prev_optimistic_slot = self.store.optimistic_header.slot;

        let new_checkpoint = apply_optimistic_update(&mut self.store, update);
        if new_checkpoint.is_some() {
            self.last_checkpoint = new_checkpoint;
        }

        if self.store.optimistic_header.slot != prev_optimistic_slot {
            self.log_optimistic_update(get_bits(&update.sync_aggregate.sync_committee_bits));
        }
    }

    fn log_finality_update(&self, participating_bits: u64) {
        let participation = participating_bits as f32 / SYNC_COMMITTEE_SIZE as f32 * 100.0;
        let decimals = if participation == 100.0 { 1 } else { 2 };
        let age = self.age(self.store.finalized_header.slot);

        info!(
            target: "lucerna::consensus",
            "finalized slot             slot={}  confidence={:.decimals$}%  age={:02}:{:02}:{:02}:{:02}",
            self.store.finalized_header.slot,
            participation,
            age.as_secs() / 86400,
            (age.as_secs() / 3600) % 24,
            (age.as_secs() / 60) % 60,
            age.as_secs() % 60,
        );
    }

    fn log_optimistic_update(&self, participating_bits: u64) {
        let participation = participating_bits as f32 / SYNC_COMMITTEE_SIZE as f32 * 100.0;
        let decimals = if participation == 100.0 { 1 } else { 2 };
        let age = self.age(self.store.optimistic_header.slot);

        info!(
            target: "lucerna::consensus",
            "updated head               slot={}  confidence={:.decimals$}%  age={:02}:{:02}:{:02}:{:02}",
            self.store.optimistic_header.slot,
            participation,
            age.as_secs() / 86400,
            (age.as_secs() / 3600) % 24,
            (age.as_secs() / 60) % 60,
            age.as_secs() % 60,
        );
    }

    fn age(&self, slot: u64) -> Duration {
        let expected_time = self.slot_timestamp(slot);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| panic!("unreachable"));

        now.saturating_sub(Duration::from_secs(expected_time))
    }

    pub fn expected_current_slot(&self) -> u64 {
        expected_current_slot(SystemTime::now(), self.config.chain.genesis_time)
    }

    fn slot_timestamp(&self, slot: u64) -> u64 {
        slot * 12 + self.config.chain.genesis_time
    }

    pub fn get_last_checkpoint(&self) -> Option<B256> {
        self.last_checkpoint
    }

    // Determines the age of blockhash_slot and returns true if it is within
    // max_checkpoint_age
    fn is_valid_checkpoint(&self, blockhash_slot: u64) -> bool {
        let current_slot = self.expected_current_slot();
        let current_slot_timestamp = self.slot_timestamp(current_slot);
        let blockhash_slot_timestamp = self.slot_timestamp(blockhash_slot);

        let slot_age = current_slot_timestamp
            .checked_sub(blockhash_slot_timestamp)
            .unwrap_or_default();

        slot_age < self.config.max_checkpoint_age
    }
}
