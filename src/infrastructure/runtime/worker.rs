//! Async worker - runs in the Tokio runtime and executes bridge commands

use std::sync::mpsc::Sender;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::abi::data_contract;
use crate::domain::error::DecodeError;
use crate::domain::DecodedEvent;
use crate::infrastructure::contract::ContractService;
use crate::infrastructure::ethereum::{create_client, ChainClient, ProviderConfig};
use crate::infrastructure::runtime::bridge::{RuntimeCommand, RuntimeEvent, SessionSettings};
use crate::infrastructure::runtime::subscription::{EventConsumer, SubscriptionSlot};

/// Forwards subscription callbacks to the bridge's event channel
struct ChannelConsumer {
    evt_tx: Sender<RuntimeEvent>,
}

impl EventConsumer for ChannelConsumer {
    fn on_event(&self, event: &DecodedEvent, summary: &str) {
        let _ = self.evt_tx.send(RuntimeEvent::Event {
            event: event.clone(),
            summary: summary.to_string(),
        });
    }

    fn on_subscription_error(&self, reason: &str) {
        let _ = self.evt_tx.send(RuntimeEvent::SubscriptionError {
            reason: reason.to_string(),
        });
    }

    fn on_subscribed(&self) {
        let _ = self.evt_tx.send(RuntimeEvent::Subscribed);
    }

    fn on_decode_error(&self, error: &DecodeError) {
        let _ = self.evt_tx.send(RuntimeEvent::DecodeFailed {
            message: error.to_string(),
        });
    }
}

/// Connect, then run the command loop
pub async fn run_async_worker(
    endpoint: ProviderConfig,
    settings: SessionSettings,
    cmd_rx: UnboundedReceiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
    session: CancellationToken,
) -> Result<()> {
    let display = endpoint.display();
    let client = create_client(endpoint, settings.sender)
        .await
        .with_context(|| format!("Connection failed ({display})"))?;

    let _ = evt_tx.send(RuntimeEvent::Connected {
        endpoint: client.endpoint_name(),
    });

    run_with_client(Arc::new(client), settings, cmd_rx, evt_tx, session).await
}

/// Command loop over an already connected client
pub async fn run_with_client(
    client: Arc<dyn ChainClient>,
    settings: SessionSettings,
    mut cmd_rx: UnboundedReceiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
    session: CancellationToken,
) -> Result<()> {
    let descriptor = data_contract::descriptor().context("Embedded ABI is invalid")?;
    let service = ContractService::new(client, settings.contract, descriptor, settings.mode)?;
    let consumer: Arc<dyn EventConsumer> = Arc::new(ChannelConsumer {
        evt_tx: evt_tx.clone(),
    });
    let mut slot = SubscriptionSlot::default();

    loop {
        let cmd = tokio::select! {
            _ = session.cancelled() => break,
            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => cmd,
                None => break,
            },
        };
        debug!(?cmd, "runtime command");

        match cmd {
            RuntimeCommand::Shutdown => break,

            RuntimeCommand::Subscribe => {
                // Failures are reported through the consumer
                let _ = slot.subscribe(&service, consumer.clone(), &session).await;
            }

            RuntimeCommand::Unsubscribe => slot.unsubscribe().await,

            RuntimeCommand::SendData(request) => {
                let service = service.clone();
                let evt_tx = evt_tx.clone();
                tokio::spawn(async move {
                    let event = match service.send_data_to_target(&request).await {
                        Ok(receipt) => RuntimeEvent::TransactionConfirmed { receipt },
                        Err(err) => RuntimeEvent::TransactionFailed {
                            message: err.to_string(),
                        },
                    };
                    let _ = evt_tx.send(event);
                });
            }

            RuntimeCommand::QueryAdmin => {
                let service = service.clone();
                let evt_tx = evt_tx.clone();
                tokio::spawn(async move {
                    let event = match service.admin().await {
                        Ok(admin) => RuntimeEvent::AdminReady { admin },
                        Err(err) => RuntimeEvent::Error {
                            message: format!("getAdmin failed: {err}"),
                        },
                    };
                    let _ = evt_tx.send(event);
                });
            }
        }
    }

    slot.unsubscribe().await;
    info!("runtime worker stopped");
    Ok(())
}
