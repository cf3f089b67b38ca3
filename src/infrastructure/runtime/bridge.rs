//! Runtime bridge - connects a synchronous front end with the async Tokio runtime
//!
//! The worker thread owns its own multi-threaded runtime. Commands flow in
//! through a Tokio channel; events flow out through a std channel that the
//! caller can block on or poll.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use alloy_primitives::Address;
use tokio::runtime::Builder;
use tokio::sync::mpsc as async_mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::abi::data_contract::DEFAULT_CONTRACT_ADDRESS;
use crate::domain::{DecodedEvent, TransactionReceipt, TransactionRequest};
use crate::infrastructure::abi::DecodeMode;
use crate::infrastructure::ethereum::ProviderConfig;
use crate::infrastructure::runtime::worker::run_async_worker;

/// Commands sent from the front end to the async worker
#[derive(Debug, Clone)]
pub enum RuntimeCommand {
    /// Start listening for `DataSentToTarget`, replacing any current listener
    Subscribe,
    /// Stop listening
    Unsubscribe,
    /// Submit `sendDataToTarget`
    SendData(TransactionRequest),
    /// Read the contract admin
    QueryAdmin,
    /// Shutdown the worker
    Shutdown,
}

/// Events sent from the async worker to the front end
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Successfully connected to a node
    Connected { endpoint: String },
    /// Log filter installed
    Subscribed,
    /// Decoded `DataSentToTarget` event
    Event {
        event: DecodedEvent,
        summary: String,
    },
    /// The subscription stopped on an error
    SubscriptionError { reason: String },
    /// Strict-mode decode failure
    DecodeFailed { message: String },
    /// Submission mined successfully
    TransactionConfirmed { receipt: TransactionReceipt },
    /// Submission rejected or reverted
    TransactionFailed { message: String },
    /// `getAdmin()` result
    AdminReady { admin: Address },
    /// Error occurred
    Error { message: String },
}

/// Per-session settings for the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Data contract address
    pub contract: Address,
    /// Node-managed account used for submissions
    pub sender: Option<Address>,
    pub mode: DecodeMode,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            contract: DEFAULT_CONTRACT_ADDRESS,
            sender: None,
            mode: DecodeMode::default(),
        }
    }
}

/// Bridge between a sync thread and the async Tokio runtime
pub struct RuntimeBridge {
    cmd_tx: async_mpsc::UnboundedSender<RuntimeCommand>,
    evt_rx: Receiver<RuntimeEvent>,
    session: CancellationToken,
}

impl RuntimeBridge {
    /// Create a new runtime bridge for one endpoint
    pub fn new(endpoint: ProviderConfig, settings: SessionSettings) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = async_mpsc::unbounded_channel::<RuntimeCommand>();
        let (evt_tx, evt_rx) = mpsc::channel::<RuntimeEvent>();
        let session = CancellationToken::new();
        let worker_session = session.clone();

        // Spawn the worker thread with its own Tokio runtime
        thread::Builder::new()
            .name("activate-runtime".to_string())
            .spawn(move || run_worker_thread(endpoint, settings, cmd_rx, evt_tx, worker_session))?;

        Ok(Self {
            cmd_tx,
            evt_rx,
            session,
        })
    }

    /// Send a command to the async worker
    pub fn send(&self, cmd: RuntimeCommand) -> anyhow::Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("Worker channel closed"))
    }

    /// Poll for events (non-blocking)
    pub fn poll_events(&self) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.evt_rx.try_recv() {
            events.push(evt);
        }
        events
    }

    /// Try to receive a single event (non-blocking)
    pub fn try_recv(&self) -> Option<RuntimeEvent> {
        self.evt_rx.try_recv().ok()
    }

    /// Block until the next event; `None` once the worker has exited
    pub fn recv(&self) -> Option<RuntimeEvent> {
        self.evt_rx.recv().ok()
    }

    /// Block for at most `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RuntimeEvent> {
        self.evt_rx.recv_timeout(timeout).ok()
    }

    /// Parent token of every subscription in this session
    pub fn session_token(&self) -> CancellationToken {
        self.session.clone()
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(RuntimeCommand::Shutdown);
        self.session.cancel();
    }
}

fn run_worker_thread(
    endpoint: ProviderConfig,
    settings: SessionSettings,
    cmd_rx: async_mpsc::UnboundedReceiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
    session: CancellationToken,
) {
    let rt = match Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            let _ = evt_tx.send(RuntimeEvent::Error {
                message: format!("Failed to create Tokio runtime: {err}"),
            });
            return;
        }
    };

    rt.block_on(async {
        if let Err(err) = run_async_worker(endpoint, settings, cmd_rx, evt_tx.clone(), session).await
        {
            let _ = evt_tx.send(RuntimeEvent::Error {
                message: format!("Worker exited: {:#}", err),
            });
        }
    });
}
