//! Error taxonomy shared by the registry, decoder, contract service and adapter

use alloy_primitives::B256;
use thiserror::Error;

/// Contract interface could not be loaded
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed ABI JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event '{0}' is not defined in the ABI")]
    MissingEvent(String),

    #[error("function '{0}' is not defined in the ABI")]
    MissingFunction(String),

    #[error("parameter '{param}' of '{item}' has unsupported type '{kind}': {reason}")]
    InvalidType {
        item: String,
        param: String,
        kind: String,
        reason: String,
    },
}

/// User supplied input rejected before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is empty")]
    Empty { field: &'static str },

    #[error("{field} must be valid hex string (even number of characters)")]
    OddLength { field: &'static str },

    #[error("{field} must be valid hex string: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} is {len} bytes, at most {max} allowed")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} must be {expected} hex characters, got {got}")]
    WrongLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Arguments could not be ABI encoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("{field} is {len} bytes, exceeds the 32-byte slot")]
    Oversized { field: &'static str, len: usize },

    #[error("'{function}' expects {expected} arguments, got {got}")]
    ArgumentCount {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("argument {index} of '{function}' does not match type '{kind}'")]
    ArgumentType {
        function: String,
        index: usize,
        kind: String,
    },
}

/// Per-event decode failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("event '{event}' has {expected} indexed parameters but the log carries {got} topics")]
    TopicCountMismatch {
        event: String,
        expected: usize,
        got: usize,
    },

    #[error("failed to decode topic {index}: {reason}")]
    Topic { index: usize, reason: String },

    #[error("failed to unpack non-indexed data: {0}")]
    Payload(String),

    #[error("field '{field}' has unexpected type '{kind}'")]
    FieldType { field: String, kind: String },

    #[error("malformed topic record: {0}")]
    TopicRecord(String),
}

/// Failures surfaced by the chain client adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transaction submission failed: {0}")]
    Submit(String),

    #[error("transaction {tx_hash} reverted in block {block_number}")]
    Revert { tx_hash: B256, block_number: u64 },

    #[error("call failed: {0}")]
    Call(String),

    #[error("subscription error: {0}")]
    Subscription(String),
}

/// Errors returned by contract service operations
#[derive(Debug, Error)]
pub enum ContractError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("unexpected return data from '{function}': {reason}")]
    Output { function: String, reason: String },
}
