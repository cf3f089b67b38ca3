//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - ABI decoding and encoding using alloy-dyn-abi
//! - Alloy-based chain client implementations
//! - The data contract service
//! - Subscription lifecycle and the Tokio runtime bridge

pub mod abi;
pub mod contract;
pub mod ethereum;
pub mod runtime;
