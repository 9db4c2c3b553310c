use alloy_primitives::B256;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("insufficient participation")]
    InsufficientParticipation,
    #[error("invalid timestamp")]
    InvalidTimestamp,
    #[error("invalid sync committee period")]
    InvalidPeriod,
    #[error("update not relevant")]
    NotRelevant,
    #[error("invalid finality proof")]
    InvalidFinalityProof,
    #[error("invalid next sync committee proof")]
    InvalidNextSyncCommitteeProof,
    #[error("invalid current sync committee proof")]
    InvalidCurrentSyncCommitteeProof,
    #[error("invalid sync committee signature")]
    InvalidSignature,
    #[error("invalid update")]
    InvalidUpdate,
    #[error("invalid header hash found: {found}, expected: {expected}")]
    InvalidHeaderHash { expected: B256, found: B256 },
    #[error("payload not found for slot: {0}")]
    PayloadNotFound(u64),
    #[error("checkpoint is too old")]
    CheckpointTooOld,
    #[error("could not fetch bootstrap: {0}")]
    BootstrapFetchFailed(String),
    #[error("consensus rpc is for the incorrect network")]
    IncorrectRpcNetwork,
}
