use alloy_primitives::FixedBytes;

mod block;
mod committee;
mod header;
mod payload;
mod store;
mod update;

pub use block::{
    Attestation, AttestationData, AttesterSlashing, BeaconBlock, BeaconBlockBody,
    BlsToExecutionChange, Checkpoint, Deposit, DepositData, Eth1Data, IndexedAttestation,
    ProposerSlashing, SignedBlsToExecutionChange, SignedVoluntaryExit, VoluntaryExit,
};
pub use committee::{SyncAggregate, SyncCommittee};
pub use header::{Header, SignedBeaconBlockHeader};
pub use payload::{ExecutionPayload, LogsBloom, Transaction, Withdrawal};
pub use store::LightClientStore;
pub use update::{Bootstrap, FinalityUpdate, GenericUpdate, OptimisticUpdate, Update};

pub type BLSPubKey = FixedBytes<48>;
pub type SignatureBytes = FixedBytes<96>;
pub type KZGCommitment = FixedBytes<48>;
