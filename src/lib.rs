//! ACTivate chain bridge
//!
//! Sends `sendDataToTarget` transactions to the data notification contract
//! and turns its `DataSentToTarget` logs into decoded events for a consumer.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod tracing_setup;
