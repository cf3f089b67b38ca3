//! Shared test doubles for the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use activate::domain::abi::data_contract;
use activate::domain::error::{ChainError, DecodeError};
use activate::domain::{DecodedEvent, LogEvent, TransactionReceipt};
use activate::infrastructure::abi::DecodeMode;
use activate::infrastructure::contract::ContractService;
use activate::infrastructure::ethereum::{AdapterSubscription, ChainClient, LogFilter};
use activate::infrastructure::runtime::EventConsumer;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, B256};
use tokio::sync::mpsc;

pub const CONTRACT: Address = Address::repeat_byte(0x24);

/// In-memory chain client that records every interaction
#[derive(Default)]
pub struct MockChainClient {
    pub reject_subscribe: bool,
    pub revert: bool,
    pub subscribes: AtomicUsize,
    pub sends: AtomicUsize,
    pub releases: Arc<AtomicUsize>,
    pub filters: Mutex<Vec<LogFilter>>,
    pub sinks: Mutex<Vec<mpsc::UnboundedSender<LogEvent>>>,
    pub error_senders: Mutex<Vec<mpsc::UnboundedSender<ChainError>>>,
    pub calldata: Mutex<Vec<Bytes>>,
    pub call_output: Bytes,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink of the most recent subscription
    pub fn sink(&self) -> mpsc::UnboundedSender<LogEvent> {
        self.sinks.lock().unwrap().last().cloned().expect("no subscription")
    }

    /// Error channel of the most recent subscription
    pub fn error_sender(&self) -> mpsc::UnboundedSender<ChainError> {
        self.error_senders
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no subscription")
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChainClient for MockChainClient {
    async fn subscribe_logs(
        &self,
        filter: LogFilter,
        sink: mpsc::UnboundedSender<LogEvent>,
    ) -> Result<AdapterSubscription, ChainError> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        if self.reject_subscribe {
            return Err(ChainError::Connect("connection refused".into()));
        }
        self.filters.lock().unwrap().push(filter);
        self.sinks.lock().unwrap().push(sink);

        let (err_tx, err_rx) = mpsc::unbounded_channel();
        self.error_senders.lock().unwrap().push(err_tx);

        let releases = self.releases.clone();
        Ok(AdapterSubscription::new(err_rx, move || {
            releases.fetch_add(1, Ordering::SeqCst);
        }))
    }

    async fn send_transaction(
        &self,
        _to: Address,
        data: Bytes,
    ) -> Result<TransactionReceipt, ChainError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.calldata.lock().unwrap().push(data);
        let tx_hash = B256::repeat_byte(0xcc);
        if self.revert {
            return Err(ChainError::Revert {
                tx_hash,
                block_number: 42,
            });
        }
        Ok(TransactionReceipt {
            tx_hash,
            block_number: 42,
            gas_used: 51_000,
        })
    }

    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ChainError> {
        Ok(self.call_output.clone())
    }

    fn endpoint_name(&self) -> String {
        "mock".to_string()
    }
}

pub fn service(client: Arc<MockChainClient>, mode: DecodeMode) -> ContractService {
    ContractService::new(
        client,
        CONTRACT,
        data_contract::descriptor().unwrap(),
        mode,
    )
    .unwrap()
}

/// Signature hash of `DataSentToTarget`
pub fn data_sent_topic() -> B256 {
    data_contract::descriptor()
        .unwrap()
        .event_by_name(data_contract::DATA_SENT_EVENT)
        .unwrap()
        .topic
}

/// A well-formed `DataSentToTarget` log
pub fn data_sent_log(block_number: u64, to: Address, topic: &str) -> LogEvent {
    let data = DynSolValue::Tuple(vec![
        DynSolValue::FixedBytes(B256::repeat_byte(0x11), 32),
        DynSolValue::FixedBytes(B256::repeat_byte(0x22), 32),
        DynSolValue::String(topic.to_string()),
    ])
    .abi_encode_params();

    LogEvent {
        address: CONTRACT,
        block_number,
        tx_hash: B256::with_last_byte(block_number as u8),
        log_index: 0,
        topics: vec![
            data_sent_topic(),
            Address::repeat_byte(0x99).into_word(),
            to.into_word(),
        ],
        data: data.into(),
        removed: false,
    }
}

/// What a [`RecordingConsumer`] saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Subscribed,
    Event { block_number: u64, summary: String },
    SubscriptionError(String),
    DecodeError(String),
}

/// Consumer that forwards every callback to a channel
pub struct RecordingConsumer {
    tx: mpsc::UnboundedSender<Seen>,
    cancel_on_event: Option<tokio_util::sync::CancellationToken>,
}

impl RecordingConsumer {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Seen>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                tx,
                cancel_on_event: None,
            }),
            rx,
        )
    }

    /// Cancels `token` from inside the first delivered event
    pub fn cancelling(
        token: tokio_util::sync::CancellationToken,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Seen>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                tx,
                cancel_on_event: Some(token),
            }),
            rx,
        )
    }
}

impl EventConsumer for RecordingConsumer {
    fn on_event(&self, event: &DecodedEvent, summary: &str) {
        let _ = self.tx.send(Seen::Event {
            block_number: event.block_number,
            summary: summary.to_string(),
        });
        if let Some(token) = &self.cancel_on_event {
            token.cancel();
        }
    }

    fn on_subscription_error(&self, reason: &str) {
        let _ = self.tx.send(Seen::SubscriptionError(reason.to_string()));
    }

    fn on_subscribed(&self) {
        let _ = self.tx.send(Seen::Subscribed);
    }

    fn on_decode_error(&self, error: &DecodeError) {
        let _ = self.tx.send(Seen::DecodeError(error.to_string()));
    }
}

/// Receive with a deadline so a broken test fails instead of hanging
pub async fn next_seen(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Seen {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for consumer callback")
        .expect("consumer channel closed")
}

/// Everything received so far, without waiting
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Vec<Seen> {
    let mut seen = Vec::new();
    while let Ok(item) = rx.try_recv() {
        seen.push(item);
    }
    seen
}
