use alloy::consensus::{Transaction as TransactionTrait, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{b256, fixed_bytes, B256, U256};
use eyre::{eyre, Result};

use common::types::{AccessListItem, Block, Signature, Transaction, Transactions};
use consensus_core::types::ExecutionPayload;

/// Converts a verified execution payload into an execution block.
///
/// Every transaction envelope is decoded, its sender recovered, and its
/// signature components exposed. Fields that stopped existing at the merge
/// carry fixed sentinel values; downstream consumers must not interpret
/// them.
pub fn payload_to_block(payload: &ExecutionPayload) -> Result<Block> {
    let empty_nonce = fixed_bytes!("0000000000000000");
    let empty_uncle_hash =
        b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");

    let base_fee = Some(payload.base_fee_per_gas.saturating_to::<u64>());

    let txs = payload
        .transactions
        .iter()
        .enumerate()
        .map(|(i, tx_bytes)| {
            let mut tx_bytes_slice = &tx_bytes[..];
            let tx_envelope = TxEnvelope::decode_2718(&mut tx_bytes_slice)
                .map_err(|err| eyre!("failed to decode transaction {i}: {err}"))?;

            let from = tx_envelope
                .recover_signer()
                .map_err(|err| eyre!("failed to recover sender of transaction {i}: {err}"))?;

            let mut tx = Transaction {
                hash: *tx_envelope.tx_hash(),
                nonce: tx_envelope.nonce(),
                block_hash: Some(payload.block_hash),
                block_number: Some(payload.block_number),
                transaction_index: i as u64,
                from,
                to: tx_envelope.to(),
                value: tx_envelope.value(),
                gas_price: Some(tx_envelope.effective_gas_price(base_fee)),
                gas: tx_envelope.gas_limit(),
                input: tx_envelope.input().clone(),
                chain_id: tx_envelope.chain_id(),
                ..Default::default()
            };

            match &tx_envelope {
                TxEnvelope::Legacy(inner) => {
                    let sig = inner.signature();
                    let parity = sig.v() as u64;
                    let v = match tx.chain_id {
                        Some(chain_id) => chain_id * 2 + 35 + parity,
                        None => 27 + parity,
                    };

                    tx.transaction_type = 0;
                    tx.signature = Some(Signature {
                        r: sig.r(),
                        s: sig.s(),
                        v,
                        y_parity: None,
                    });
                }
                TxEnvelope::Eip2930(inner) => {
                    let sig = inner.signature();

                    tx.transaction_type = 1;
                    tx.signature = Some(Signature {
                        r: sig.r(),
                        s: sig.s(),
                        v: sig.v() as u64,
                        y_parity: Some(sig.v()),
                    });
                    tx.access_list = Some(convert_access_list(&tx_envelope));
                }
                TxEnvelope::Eip1559(inner) => {
                    let sig = inner.signature();

                    tx.transaction_type = 2;
                    tx.signature = Some(Signature {
                        r: sig.r(),
                        s: sig.s(),
                        v: sig.v() as u64,
                        y_parity: Some(sig.v()),
                    });
                    tx.access_list = Some(convert_access_list(&tx_envelope));
                    tx.max_fee_per_gas = Some(tx_envelope.max_fee_per_gas());
                    tx.max_priority_fee_per_gas = tx_envelope.max_priority_fee_per_gas();
                }
                TxEnvelope::Eip4844(inner) => {
                    let sig = inner.signature();

                    tx.transaction_type = 3;
                    tx.signature = Some(Signature {
                        r: sig.r(),
                        s: sig.s(),
                        v: sig.v() as u64,
                        y_parity: Some(sig.v()),
                    });
                    tx.access_list = Some(convert_access_list(&tx_envelope));
                    tx.max_fee_per_gas = Some(tx_envelope.max_fee_per_gas());
                    tx.max_priority_fee_per_gas = tx_envelope.max_priority_fee_per_gas();
                    tx.max_fee_per_blob_gas = tx_envelope.max_fee_per_blob_gas();
                    tx.blob_versioned_hashes = tx_envelope
                        .blob_versioned_hashes()
                        .map(|hashes| hashes.to_vec());
                }
                _ => return Err(eyre!("unsupported transaction type in payload")),
            }

            Ok(tx)
        })
        .collect::<Result<Vec<Transaction>>>()?;

    Ok(Block {
        number: payload.block_number,
        base_fee_per_gas: payload.base_fee_per_gas,
        difficulty: U256::ZERO,
        extra_data: payload.extra_data.to_vec().into(),
        gas_limit: payload.gas_limit,
        gas_used: payload.gas_used,
        hash: payload.block_hash,
        logs_bloom: payload.logs_bloom.to_vec().into(),
        miner: payload.fee_recipient,
        mix_hash: payload.prev_randao,
        nonce: empty_nonce,
        parent_hash: payload.parent_hash,
        receipts_root: payload.receipts_root,
        sha3_uncles: empty_uncle_hash,
        size: 0,
        state_root: payload.state_root,
        timestamp: payload.timestamp,
        total_difficulty: U256::ZERO,
        transactions: Transactions::Full(txs),
        transactions_root: B256::ZERO,
        uncles: Vec::new(),
        blob_gas_used: Some(payload.blob_gas_used),
        excess_blob_gas: Some(payload.excess_blob_gas),
    })
}

fn convert_access_list(tx_envelope: &TxEnvelope) -> Vec<AccessListItem> {
    tx_envelope
        .access_list()
        .map(|access_list| {
            access_list
                .iter()
                .map(|item| AccessListItem {
                    address: item.address,
                    storage_keys: item.storage_keys.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}
