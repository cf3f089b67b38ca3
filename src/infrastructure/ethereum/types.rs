//! Type conversions between Alloy RPC types and domain types

use alloy::rpc::types::{Log, TransactionReceipt as RpcReceipt};

use crate::domain::error::ChainError;
use crate::domain::{LogEvent, TransactionReceipt};

/// Convert an RPC log into the adapter-neutral form
pub fn convert_log(log: &Log) -> LogEvent {
    LogEvent {
        address: log.address(),
        block_number: log.block_number.unwrap_or_default(),
        tx_hash: log.transaction_hash.unwrap_or_default(),
        log_index: log.log_index.unwrap_or_default(),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        removed: log.removed,
    }
}

/// Convert a mined receipt, mapping a failed status to a revert
pub fn convert_receipt(receipt: &RpcReceipt) -> Result<TransactionReceipt, ChainError> {
    let block_number = receipt.block_number.unwrap_or_default();
    if !receipt.status() {
        return Err(ChainError::Revert {
            tx_hash: receipt.transaction_hash,
            block_number,
        });
    }
    Ok(TransactionReceipt {
        tx_hash: receipt.transaction_hash,
        block_number,
        gas_used: receipt.gas_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, Bytes, LogData, B256};

    #[test]
    fn test_convert_log() {
        let inner = alloy::primitives::Log {
            address: Address::repeat_byte(0x24),
            data: LogData::new_unchecked(
                vec![B256::repeat_byte(1), B256::repeat_byte(2)],
                Bytes::from(vec![0xde, 0xad]),
            ),
        };
        let log = Log {
            inner,
            block_number: Some(77),
            transaction_hash: Some(B256::repeat_byte(9)),
            log_index: Some(3),
            removed: true,
            ..Default::default()
        };

        let event = convert_log(&log);
        assert_eq!(event.address, Address::repeat_byte(0x24));
        assert_eq!(event.block_number, 77);
        assert_eq!(event.tx_hash, B256::repeat_byte(9));
        assert_eq!(event.log_index, 3);
        assert_eq!(event.topics.len(), 2);
        assert_eq!(event.data.as_ref(), &[0xde, 0xad]);
        assert!(event.removed);
    }

    #[test]
    fn test_convert_pending_log_defaults() {
        let event = convert_log(&Log::default());
        assert_eq!(event.block_number, 0);
        assert!(event.topics.is_empty());
    }
}
