//! Chain client abstraction and Alloy implementations
//!
//! WebSocket and IPC endpoints use `eth_subscribe("logs")`. HTTP endpoints
//! cannot push, so they fall back to filter polling with `eth_newFilter` and
//! `eth_getFilterChanges`.

use std::path::PathBuf;

use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{
    fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
    FilterPollerBuilder, Identity, Provider, ProviderBuilder, RootProvider,
};
use alloy::rpc::client::PollerBuilder;
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::error::ChainError;
use crate::domain::{LogEvent, TransactionReceipt};
use crate::infrastructure::ethereum::subscription::AdapterSubscription;
use crate::infrastructure::ethereum::types::{convert_log, convert_receipt};

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    /// HTTP JSON-RPC endpoint
    Http(String),
    /// WebSocket endpoint
    WebSocket(String),
    /// IPC socket path (Unix only)
    #[cfg(unix)]
    Ipc(PathBuf),
}

impl ProviderConfig {
    /// Pick the transport from the URL scheme
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("ws://") || url.starts_with("wss://") {
            ProviderConfig::WebSocket(url.to_string())
        } else {
            ProviderConfig::Http(url.to_string())
        }
    }

    /// Get display name for this endpoint
    pub fn display(&self) -> String {
        match self {
            ProviderConfig::Http(url) => url.clone(),
            ProviderConfig::WebSocket(url) => url.clone(),
            #[cfg(unix)]
            ProviderConfig::Ipc(path) => path.display().to_string(),
        }
    }

    /// Whether the endpoint can push logs instead of being polled
    pub fn supports_push(&self) -> bool {
        !matches!(self, ProviderConfig::Http(_))
    }
}

/// What `subscribe_logs` should match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    /// Required `topics[0]`, if any
    pub event_signature: Option<B256>,
}

impl LogFilter {
    fn to_rpc(self) -> Filter {
        let filter = Filter::new().address(self.address);
        match self.event_signature {
            Some(signature) => filter.event_signature(signature),
            None => filter,
        }
    }
}

/// Abstract chain client
///
/// The narrow set of chain operations the contract service needs, so the
/// service can run against any transport or a test double. No retries happen
/// at this level.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Install a log filter and push matching logs into `sink` until released
    async fn subscribe_logs(
        &self,
        filter: LogFilter,
        sink: mpsc::UnboundedSender<LogEvent>,
    ) -> Result<AdapterSubscription, ChainError>;

    /// Submit a transaction and wait for its receipt
    async fn send_transaction(
        &self,
        to: Address,
        data: Bytes,
    ) -> Result<TransactionReceipt, ChainError>;

    /// Execute a read-only call (eth_call)
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

    /// Get endpoint display name
    fn endpoint_name(&self) -> String;
}

// All transports share the recommended filler stack
type FilledProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
    Ethereum,
>;

/// Enum-based client that stores the connected provider for each transport
pub enum AlloyChainClient {
    Http {
        provider: FilledProvider,
        endpoint: String,
        sender: Option<Address>,
    },
    WebSocket {
        provider: FilledProvider,
        endpoint: String,
        sender: Option<Address>,
    },
    #[cfg(unix)]
    Ipc {
        provider: FilledProvider,
        endpoint: String,
        sender: Option<Address>,
    },
}

/// Connect to an endpoint
///
/// `sender` is the node-managed account used for `eth_sendTransaction`; it is
/// only required for submissions.
pub async fn create_client(
    config: ProviderConfig,
    sender: Option<Address>,
) -> Result<AlloyChainClient, ChainError> {
    let client = match config {
        ProviderConfig::Http(url) => {
            let rpc_url = url
                .parse()
                .map_err(|err| ChainError::Connect(format!("invalid HTTP URL {url}: {err}")))?;
            let provider = ProviderBuilder::new().connect_http(rpc_url);
            AlloyChainClient::Http {
                provider,
                endpoint: url,
                sender,
            }
        }
        ProviderConfig::WebSocket(url) => {
            let provider = ProviderBuilder::new()
                .connect(&url)
                .await
                .map_err(|err| ChainError::Connect(format!("{url}: {err}")))?;
            AlloyChainClient::WebSocket {
                provider,
                endpoint: url,
                sender,
            }
        }
        #[cfg(unix)]
        ProviderConfig::Ipc(path) => {
            use alloy::providers::IpcConnect;
            let ipc_path = path.to_string_lossy().to_string();
            let ipc = IpcConnect::new(ipc_path);
            let provider = ProviderBuilder::new()
                .connect_ipc(ipc)
                .await
                .map_err(|err| ChainError::Connect(format!("{}: {err}", path.display())))?;
            AlloyChainClient::Ipc {
                provider,
                endpoint: path.display().to_string(),
                sender,
            }
        }
    };
    info!(endpoint = %client.endpoint_name(), "connected");
    Ok(client)
}

impl AlloyChainClient {
    fn provider(&self) -> &FilledProvider {
        match self {
            AlloyChainClient::Http { provider, .. } => provider,
            AlloyChainClient::WebSocket { provider, .. } => provider,
            #[cfg(unix)]
            AlloyChainClient::Ipc { provider, .. } => provider,
        }
    }

    fn sender(&self) -> Option<Address> {
        match self {
            AlloyChainClient::Http { sender, .. } => *sender,
            AlloyChainClient::WebSocket { sender, .. } => *sender,
            #[cfg(unix)]
            AlloyChainClient::Ipc { sender, .. } => *sender,
        }
    }
}

/// Forward a log stream into the sink on a background task
///
/// Release aborts the task, then runs `uninstall` to drop the filter on the
/// node. A stream that ends on its own is reported through the error channel.
fn forward_logs<S>(
    stream: S,
    sink: mpsc::UnboundedSender<LogEvent>,
    uninstall: impl FnOnce() + Send + 'static,
) -> AdapterSubscription
where
    S: Stream<Item = Log> + Send + 'static,
{
    let (err_tx, err_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let mut stream = Box::pin(stream);
        while let Some(log) = stream.next().await {
            if sink.send(convert_log(&log)).is_err() {
                debug!("log sink closed, stopping forwarder");
                return;
            }
        }
        warn!("log stream ended");
        let _ = err_tx.send(ChainError::Subscription("log stream ended".to_string()));
    });

    AdapterSubscription::new(err_rx, move || {
        task.abort();
        uninstall();
    })
}

/// Release hook for an `eth_subscribe` subscription
fn pubsub_uninstall(provider: &FilledProvider, id: B256) -> impl FnOnce() + Send + 'static {
    let root = provider.root().clone();
    move || match root.unsubscribe(id) {
        Ok(()) => debug!(%id, "log subscription cancelled"),
        Err(err) => warn!(%id, %err, "eth_unsubscribe failed"),
    }
}

/// Release hook for an `eth_newFilter` filter
///
/// `eth_uninstallFilter` is a request, so it runs on the current runtime.
fn filter_uninstall(provider: &FilledProvider, id: U256) -> impl FnOnce() + Send + 'static {
    let provider = provider.clone();
    move || {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(%id, "no runtime to uninstall log filter");
            return;
        };
        handle.spawn(async move {
            match provider.uninstall_filter(id).await {
                Ok(removed) => debug!(%id, removed, "log filter uninstalled"),
                Err(err) => warn!(%id, %err, "eth_uninstallFilter failed"),
            }
        });
    }
}

#[async_trait::async_trait]
impl ChainClient for AlloyChainClient {
    async fn subscribe_logs(
        &self,
        filter: LogFilter,
        sink: mpsc::UnboundedSender<LogEvent>,
    ) -> Result<AdapterSubscription, ChainError> {
        let rpc_filter = filter.to_rpc();
        debug!(address = %filter.address, topic0 = ?filter.event_signature, "installing log filter");

        match self {
            AlloyChainClient::Http { provider, .. } => {
                // Same poller as `watch_logs`, keeping the filter id for release
                let id = provider
                    .new_filter(&rpc_filter)
                    .await
                    .map_err(|err| ChainError::Connect(err.to_string()))?;
                let poller: FilterPollerBuilder<Log> =
                    PollerBuilder::new(provider.weak_client(), "eth_getFilterChanges", (id,));
                let stream = poller.into_stream().flat_map(futures::stream::iter);
                Ok(forward_logs(stream, sink, filter_uninstall(provider, id)))
            }
            AlloyChainClient::WebSocket { provider, .. } => {
                let sub = provider
                    .subscribe_logs(&rpc_filter)
                    .await
                    .map_err(|err| ChainError::Connect(err.to_string()))?;
                let uninstall = pubsub_uninstall(provider, *sub.local_id());
                Ok(forward_logs(sub.into_stream(), sink, uninstall))
            }
            #[cfg(unix)]
            AlloyChainClient::Ipc { provider, .. } => {
                let sub = provider
                    .subscribe_logs(&rpc_filter)
                    .await
                    .map_err(|err| ChainError::Connect(err.to_string()))?;
                let uninstall = pubsub_uninstall(provider, *sub.local_id());
                Ok(forward_logs(sub.into_stream(), sink, uninstall))
            }
        }
    }

    async fn send_transaction(
        &self,
        to: Address,
        data: Bytes,
    ) -> Result<TransactionReceipt, ChainError> {
        let from = self
            .sender()
            .ok_or_else(|| ChainError::Submit("no sender account configured".to_string()))?;
        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(data);

        let pending = self
            .provider()
            .send_transaction(request)
            .await
            .map_err(|err| ChainError::Submit(err.to_string()))?;
        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, "transaction submitted");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|err| ChainError::Submit(format!("{tx_hash}: {err}")))?;
        convert_receipt(&receipt)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        self.provider()
            .call(request)
            .await
            .map_err(|err| ChainError::Call(err.to_string()))
    }

    fn endpoint_name(&self) -> String {
        match self {
            AlloyChainClient::Http { endpoint, .. } => endpoint.clone(),
            AlloyChainClient::WebSocket { endpoint, .. } => endpoint.clone(),
            #[cfg(unix)]
            AlloyChainClient::Ipc { endpoint, .. } => endpoint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_from_url() {
        assert_eq!(
            ProviderConfig::from_url("ws://localhost:8546"),
            ProviderConfig::WebSocket("ws://localhost:8546".into())
        );
        assert_eq!(
            ProviderConfig::from_url("https://rpc.example.org"),
            ProviderConfig::Http("https://rpc.example.org".into())
        );
        assert!(!ProviderConfig::from_url("http://localhost:8545").supports_push());
    }

    #[test]
    fn test_log_filter_carries_topic0() {
        let signature = B256::repeat_byte(0x5e);
        let filter = LogFilter {
            address: Address::repeat_byte(0x24),
            event_signature: Some(signature),
        }
        .to_rpc();
        assert!(filter.address.matches(&Address::repeat_byte(0x24)));
        assert!(filter.topics[0].matches(&signature));
        assert!(!filter.topics[0].matches(&B256::ZERO));
    }

    #[tokio::test]
    async fn test_forward_logs_reports_stream_end() {
        let (sink, mut logs) = mpsc::unbounded_channel();
        let mut sub = forward_logs(futures::stream::iter(vec![Log::default()]), sink, || {});

        assert!(logs.recv().await.is_some());
        assert!(matches!(sub.next_error().await, ChainError::Subscription(_)));
        sub.unsubscribe();
    }

    #[tokio::test]
    async fn test_release_stops_forwarder_and_uninstalls() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let uninstalled = Arc::new(AtomicUsize::new(0));
        let counter = uninstalled.clone();
        let (sink, mut logs) = mpsc::unbounded_channel();
        let mut sub = forward_logs(futures::stream::pending::<Log>(), sink, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(uninstalled.load(Ordering::SeqCst), 1);
        // The aborted forwarder drops its sink
        assert!(logs.recv().await.is_none());
    }
}
