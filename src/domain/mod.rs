//! Domain layer - contract interface, events, transactions and errors
//!
//! Nothing here performs I/O; the infrastructure layer builds on these types.

pub mod abi;
pub mod error;
pub mod event;
pub mod transaction;

pub use error::{ChainError, ContractError, DecodeError, EncodingError, ParseError, ValidationError};
pub use event::{DecodedEvent, KeyFormat, LogEvent, TopicPayload, TopicRecord};
pub use transaction::{
    SendDataForm, TopicFormat, TopicInput, TransactionReceipt, TransactionRequest,
};
