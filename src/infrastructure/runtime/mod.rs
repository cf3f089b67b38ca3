//! Runtime layer - subscription lifecycle and the sync/async bridge

mod bridge;
mod subscription;
mod worker;

pub use bridge::{RuntimeBridge, RuntimeCommand, RuntimeEvent, SessionSettings};
pub use subscription::{EventConsumer, SubscriptionHandle, SubscriptionSlot, SubscriptionState};
pub use worker::run_with_client;
