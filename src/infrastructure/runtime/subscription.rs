//! Subscription lifecycle - one background task per active subscription
//!
//! Each [`SubscriptionHandle`] owns a child of the session cancellation token
//! and the task that drains its [`DataSentSubscription`]. Cancellation wins
//! over anything queued; logs already received are delivered before an
//! adapter error ends the task. The adapter filter is released exactly once.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::error::{ChainError, DecodeError};
use crate::domain::DecodedEvent;
use crate::infrastructure::contract::{ContractService, DataSentSubscription, SubscriptionItem};

/// Where a subscription is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    Subscribing,
    Active,
    Cancelled,
    Errored(String),
}

impl SubscriptionState {
    /// Cancelled and Errored are final for a handle
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionState::Cancelled | SubscriptionState::Errored(_))
    }
}

/// Receives decoded events and lifecycle notifications
///
/// Callbacks run on the subscription task, one at a time and in log order.
pub trait EventConsumer: Send + Sync + 'static {
    fn on_event(&self, event: &DecodedEvent, summary: &str);

    fn on_subscription_error(&self, reason: &str);

    fn on_subscribed(&self);

    /// Strict-mode decode failures; ignored unless overridden
    fn on_decode_error(&self, _error: &DecodeError) {}
}

/// An owned, running subscription
pub struct SubscriptionHandle {
    token: CancellationToken,
    state: watch::Receiver<SubscriptionState>,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Install the `DataSentToTarget` filter and start delivering to `consumer`
    ///
    /// Cancelling `parent` stops this subscription too. An adapter rejection
    /// is reported to the consumer and returned as [`ChainError::Connect`].
    pub async fn spawn(
        service: &ContractService,
        consumer: Arc<dyn EventConsumer>,
        parent: &CancellationToken,
    ) -> Result<Self, ChainError> {
        let (state_tx, state_rx) = watch::channel(SubscriptionState::Subscribing);
        let token = parent.child_token();

        let subscription = match service.subscribe_data_sent_to_target().await {
            Ok(subscription) => subscription,
            Err(err) => {
                let reason = err.to_string();
                warn!(%reason, "subscribe rejected");
                let _ = state_tx.send(SubscriptionState::Errored(reason.clone()));
                consumer.on_subscription_error(&reason);
                return Err(match err {
                    ChainError::Connect(_) => err,
                    other => ChainError::Connect(other.to_string()),
                });
            }
        };

        let _ = state_tx.send(SubscriptionState::Active);
        consumer.on_subscribed();

        let task = tokio::spawn(run_subscription(
            subscription,
            consumer,
            token.clone(),
            state_tx,
        ));

        Ok(Self {
            token,
            state: state_rx,
            task: Some(task),
        })
    }

    pub fn state(&self) -> SubscriptionState {
        self.state.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        *self.state.borrow() == SubscriptionState::Active
    }

    /// Wait until the subscription reaches Cancelled or Errored
    pub async fn wait_terminal(&self) -> SubscriptionState {
        let mut state = self.state.clone();
        let terminal = match state.wait_for(SubscriptionState::is_terminal).await {
            Ok(terminal) => terminal.clone(),
            Err(_) => self.state(),
        };
        terminal
    }

    /// Stop delivery and release the adapter filter
    ///
    /// Returns once the task has finished. Calling it again does nothing.
    pub async fn unsubscribe(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(%err, "subscription task failed");
            }
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_subscription(
    mut subscription: DataSentSubscription,
    consumer: Arc<dyn EventConsumer>,
    token: CancellationToken,
    state: watch::Sender<SubscriptionState>,
) {
    let outcome = loop {
        let item = tokio::select! {
            biased;
            _ = token.cancelled() => break SubscriptionState::Cancelled,
            item = subscription.next() => item,
        };

        match item {
            SubscriptionItem::Log(log) => match subscription.decode(&log) {
                Ok(Some(decoded)) => {
                    if token.is_cancelled() {
                        break SubscriptionState::Cancelled;
                    }
                    consumer.on_event(&decoded.event, &decoded.summary);
                }
                Ok(None) => {}
                Err(err) => consumer.on_decode_error(&err),
            },
            SubscriptionItem::Error(err) => break SubscriptionState::Errored(err.to_string()),
            SubscriptionItem::Closed => {
                break SubscriptionState::Errored("log stream closed".to_string())
            }
        }
    };

    subscription.close();
    match &outcome {
        SubscriptionState::Errored(reason) => {
            warn!(%reason, "subscription failed");
            consumer.on_subscription_error(reason);
        }
        _ => info!("subscription cancelled"),
    }
    let _ = state.send(outcome);
}

/// Holds at most one subscription for a listener
///
/// Subscribing again tears the previous handle down first.
#[derive(Default)]
pub struct SubscriptionSlot {
    current: Option<SubscriptionHandle>,
}

impl SubscriptionSlot {
    pub async fn subscribe(
        &mut self,
        service: &ContractService,
        consumer: Arc<dyn EventConsumer>,
        parent: &CancellationToken,
    ) -> Result<(), ChainError> {
        self.unsubscribe().await;
        self.current = Some(SubscriptionHandle::spawn(service, consumer, parent).await?);
        Ok(())
    }

    pub async fn unsubscribe(&mut self) {
        if let Some(mut handle) = self.current.take() {
            handle.unsubscribe().await;
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.current
            .as_ref()
            .map_or(SubscriptionState::Idle, SubscriptionHandle::state)
    }

    pub fn handle(&self) -> Option<&SubscriptionHandle> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SubscriptionState::Idle.is_terminal());
        assert!(!SubscriptionState::Active.is_terminal());
        assert!(SubscriptionState::Cancelled.is_terminal());
        assert!(SubscriptionState::Errored("x".into()).is_terminal());
    }

    #[test]
    fn test_empty_slot_is_idle() {
        let slot = SubscriptionSlot::default();
        assert_eq!(slot.state(), SubscriptionState::Idle);
        assert!(slot.handle().is_none());
    }
}
