use std::fmt::Display;

use thiserror::Error;

use crate::types::BlockTag;

/// A transport level error from one of the consensus RPC endpoints.
#[derive(Debug, Error)]
#[error("rpc error on method: {method}, message: {message}")]
pub struct RpcError {
    method: String,
    message: String,
}

impl RpcError {
    pub fn new<E: Display>(method: &str, err: E) -> Self {
        Self {
            method: method.to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Error)]
#[error("block not available: {block}")]
pub struct BlockNotFoundError {
    block: BlockTag,
}

impl BlockNotFoundError {
    pub fn new(block: BlockTag) -> Self {
        Self { block }
    }
}
