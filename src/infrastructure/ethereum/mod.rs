//! Ethereum infrastructure - chain client trait and Alloy implementations

mod provider;
mod subscription;
pub(crate) mod types;

pub use provider::{create_client, AlloyChainClient, ChainClient, LogFilter, ProviderConfig};
pub use subscription::AdapterSubscription;
