pub use client::{Client, ClientBuilder};

pub mod database {
    pub use client::database::{ConfigDB, Database, FileDB};
}

pub mod config {
    pub use config::{checkpoints, networks, Config};
}

pub mod types {
    pub use common::types::{Block, BlockTag, Transaction, Transactions};
}

pub mod errors {
    pub use common::errors::{BlockNotFoundError, RpcError};
    pub use consensus_core::errors::ConsensusError;
}

pub mod consensus {
    pub use consensus::rpc::nimbus_rpc::NimbusRpc;
    pub use consensus::rpc::ConsensusRpc;
    pub use consensus::{ConsensusClient, Inner};
    pub use consensus_core::types::LightClientStore;
}

pub mod execution {
    pub use execution::payload_to_block;
}

pub mod prelude {
    pub use crate::config::*;
    pub use crate::database::*;
    pub use crate::errors::*;
    pub use crate::types::*;
    pub use crate::{Client, ClientBuilder};
}
