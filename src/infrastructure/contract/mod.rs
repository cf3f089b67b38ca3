//! Contract layer - the data contract's send, read and subscribe operations

mod service;

pub use service::{ContractService, DataSentSubscription, SubscriptionItem};
