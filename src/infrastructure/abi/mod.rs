//! ABI infrastructure - event decoding and calldata encoding using alloy-dyn-abi

mod decoder;
mod encoder;

pub use decoder::{DecodeMode, DecodedLog, EventDecoder};
pub use encoder::{decode_output, encode_call};
