//! ABI domain models
//!
//! The contract interface is parsed once with alloy-json-abi and shared
//! read-only by the decoder and the transaction builder.

pub mod data_contract;
mod registry;

pub use registry::{ContractDescriptor, EventDescriptor, FunctionDescriptor, ParamSpec};
