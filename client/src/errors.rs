use common::errors::BlockNotFoundError;
use thiserror::Error;

/// Errors that can occur during Node calls
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("out of sync: {0} seconds behind")]
    OutOfSync(u64),

    #[error(transparent)]
    BlockNotFoundError(#[from] BlockNotFoundError),
}
