//! Contract service - typed operations on the data contract

use std::sync::Arc;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::Address;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::abi::data_contract::{DATA_SENT_EVENT, GET_ADMIN_FUNCTION, SEND_DATA_FUNCTION};
use crate::domain::abi::{ContractDescriptor, FunctionDescriptor};
use crate::domain::error::{ChainError, ContractError, DecodeError, ParseError};
use crate::domain::{LogEvent, SendDataForm, TransactionReceipt, TransactionRequest};
use crate::infrastructure::abi::{decode_output, encode_call, DecodeMode, DecodedLog, EventDecoder};
use crate::infrastructure::ethereum::{AdapterSubscription, ChainClient, LogFilter};

/// Operations on one deployed data contract
///
/// Cheap to clone; the descriptor and decoder are shared read-only.
#[derive(Clone)]
pub struct ContractService {
    client: Arc<dyn ChainClient>,
    address: Address,
    descriptor: Arc<ContractDescriptor>,
    decoder: Arc<EventDecoder>,
}

impl ContractService {
    /// Bind a client to the contract at `address`
    ///
    /// Fails when the descriptor lacks the event or the functions used here.
    pub fn new(
        client: Arc<dyn ChainClient>,
        address: Address,
        descriptor: ContractDescriptor,
        mode: DecodeMode,
    ) -> Result<Self, ParseError> {
        let descriptor =
            descriptor.require(&[DATA_SENT_EVENT], &[SEND_DATA_FUNCTION, GET_ADMIN_FUNCTION])?;
        let event = descriptor
            .event_by_name(DATA_SENT_EVENT)
            .ok_or_else(|| ParseError::MissingEvent(DATA_SENT_EVENT.to_string()))?;
        let decoder = EventDecoder::new(event, mode);

        Ok(Self {
            client,
            address,
            descriptor: Arc::new(descriptor),
            decoder: Arc::new(decoder),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn endpoint_name(&self) -> String {
        self.client.endpoint_name()
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    pub fn decoder(&self) -> &EventDecoder {
        &self.decoder
    }

    fn function(&self, name: &str) -> Result<&FunctionDescriptor, ContractError> {
        self.descriptor
            .function_by_name(name)
            .ok_or_else(|| ContractError::Output {
                function: name.to_string(),
                reason: "not in ABI".to_string(),
            })
    }

    /// Encode and submit `sendDataToTarget`, waiting for confirmation
    pub async fn send_data_to_target(
        &self,
        request: &TransactionRequest,
    ) -> Result<TransactionReceipt, ContractError> {
        let function = self.function(SEND_DATA_FUNCTION)?;
        let args = vec![
            DynSolValue::Address(request.target),
            DynSolValue::FixedBytes(request.owner_word()?, 32),
            DynSolValue::FixedBytes(request.act_ref_word()?, 32),
            DynSolValue::String(request.topic.clone()),
        ];
        let calldata = encode_call(function, args)?;
        debug!(
            recipient = %request.target,
            bytes = calldata.len(),
            "submitting {}",
            function.signature
        );

        let receipt = self.client.send_transaction(self.address, calldata).await?;
        info!(
            tx_hash = %receipt.tx_hash,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "sendDataToTarget confirmed"
        );
        Ok(receipt)
    }

    /// Validate raw form input, then submit
    ///
    /// Invalid input never reaches the chain client.
    pub async fn submit_form(&self, form: &SendDataForm) -> Result<TransactionReceipt, ContractError> {
        let request = form.validate()?;
        self.send_data_to_target(&request).await
    }

    /// Read the contract admin with `getAdmin()`
    pub async fn admin(&self) -> Result<Address, ContractError> {
        let function = self.function(GET_ADMIN_FUNCTION)?;
        let calldata = encode_call(function, Vec::new())?;
        let output = self.client.call(self.address, calldata).await?;

        let values = decode_output(function, &output).map_err(|reason| ContractError::Output {
            function: function.name.clone(),
            reason,
        })?;
        values
            .first()
            .and_then(DynSolValue::as_address)
            .ok_or_else(|| ContractError::Output {
                function: function.name.clone(),
                reason: "expected a single address".to_string(),
            })
    }

    /// Install a filter for `DataSentToTarget` logs at the contract address
    pub async fn subscribe_data_sent_to_target(&self) -> Result<DataSentSubscription, ChainError> {
        let (sink, logs) = mpsc::unbounded_channel();
        let filter = LogFilter {
            address: self.address,
            event_signature: Some(self.decoder.topic()),
        };
        let adapter = self.client.subscribe_logs(filter, sink).await?;
        info!(address = %self.address, event = self.decoder.event_name(), "subscribed");

        Ok(DataSentSubscription {
            logs,
            adapter,
            decoder: self.decoder.clone(),
        })
    }
}

/// What a [`DataSentSubscription`] produced next
#[derive(Debug)]
pub enum SubscriptionItem {
    Log(LogEvent),
    Error(ChainError),
    /// The adapter dropped its end of the log channel
    Closed,
}

/// An installed `DataSentToTarget` filter
///
/// Raw logs arrive in order and go through the decoder before they are
/// handed out.
#[derive(Debug)]
pub struct DataSentSubscription {
    logs: mpsc::UnboundedReceiver<LogEvent>,
    adapter: AdapterSubscription,
    decoder: Arc<EventDecoder>,
}

impl DataSentSubscription {
    /// Wait for the next log or adapter error
    ///
    /// Logs already received come out before a pending adapter error. Once
    /// the log channel is closed, a queued error is preferred over `Closed`.
    pub async fn next(&mut self) -> SubscriptionItem {
        let next = tokio::select! {
            biased;
            log = self.logs.recv() => Ok(log),
            err = self.adapter.next_error() => Err(err),
        };

        match next {
            Ok(Some(log)) => SubscriptionItem::Log(log),
            Ok(None) => match self.adapter.try_error() {
                Some(err) => SubscriptionItem::Error(err),
                None => SubscriptionItem::Closed,
            },
            Err(err) => SubscriptionItem::Error(err),
        }
    }

    /// Run a raw log through the decode pipeline
    pub fn decode(&self, log: &LogEvent) -> Result<Option<DecodedLog>, DecodeError> {
        let decoded = self.decoder.decode(log);
        if let Err(err) = &decoded {
            warn!(block = log.block_number, tx_hash = %log.tx_hash, %err, "undecodable log");
        }
        decoded
    }

    /// Release the adapter filter and close the delivery channel
    pub fn close(&mut self) {
        self.adapter.unsubscribe();
        self.logs.close();
    }

    pub fn is_closed(&self) -> bool {
        self.adapter.is_released()
    }
}
