//! Event decode pipeline using alloy-dyn-abi
//!
//! Signature match, indexed topic extraction, non-indexed payload unpacking,
//! name-based field assignment and composite topic parsing.

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::B256;
use tracing::{debug, warn};

use crate::domain::abi::{EventDescriptor, ParamSpec};
use crate::domain::error::DecodeError;
use crate::domain::event::{DecodedEvent, LogEvent, TopicPayload};

/// How a topic count below the indexed parameter count is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Extract what is there and note the gap
    #[default]
    Lenient,
    /// Reject the log with [`DecodeError::TopicCountMismatch`]
    Strict,
}

/// Writes a decoded value into its semantic role; false on type mismatch
type FieldSetter = fn(&mut DecodedEvent, &DynSolValue) -> bool;

#[derive(Debug, Clone)]
struct FieldSlot {
    name: String,
    kind: String,
    ty: DynSolType,
    setter: Option<FieldSetter>,
}

impl FieldSlot {
    fn new(param: &ParamSpec) -> Self {
        Self {
            name: param.name.clone(),
            kind: param.kind.clone(),
            ty: param.ty.clone(),
            setter: setter_for(&param.name),
        }
    }
}

/// Result of decoding one matching log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    pub event: DecodedEvent,
    /// Built only from fields that were extracted
    pub summary: String,
    /// Non-fatal problems met while decoding
    pub diagnostics: Vec<String>,
}

/// Decoder for a single event type
///
/// The field setter table is resolved once from the descriptor.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    name: String,
    topic: B256,
    indexed: Vec<FieldSlot>,
    data: Vec<FieldSlot>,
    data_type: DynSolType,
    mode: DecodeMode,
}

impl EventDecoder {
    pub fn new(event: &EventDescriptor, mode: DecodeMode) -> Self {
        let indexed: Vec<FieldSlot> = event.indexed().map(FieldSlot::new).collect();
        let data: Vec<FieldSlot> = event.non_indexed().map(FieldSlot::new).collect();
        let data_type = DynSolType::Tuple(data.iter().map(|slot| slot.ty.clone()).collect());

        Self {
            name: event.name.clone(),
            topic: event.topic,
            indexed,
            data,
            data_type,
            mode,
        }
    }

    pub fn event_name(&self) -> &str {
        &self.name
    }

    /// Signature hash expected in topic 0
    pub fn topic(&self) -> B256 {
        self.topic
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Decode a log
    ///
    /// # Returns
    /// * `Ok(None)` - the log belongs to another event (or was removed)
    /// * `Ok(Some(..))` - decoded, possibly with empty fields and diagnostics
    /// * `Err(..)` - strict mode only, topic count mismatch
    pub fn decode(&self, log: &LogEvent) -> Result<Option<DecodedLog>, DecodeError> {
        if log.removed {
            debug!(block = log.block_number, tx_hash = %log.tx_hash, "skipping removed log");
            return Ok(None);
        }
        match log.topics.first() {
            Some(topic) if *topic == self.topic => {}
            other => {
                debug!(
                    event = %self.name,
                    topic0 = ?other,
                    expected = %self.topic,
                    "log does not match event signature, skipping"
                );
                return Ok(None);
            }
        }

        let mut event = DecodedEvent {
            block_number: log.block_number,
            tx_hash: log.tx_hash,
            ..Default::default()
        };
        let mut diagnostics = Vec::new();

        self.decode_indexed(log, &mut event, &mut diagnostics)?;
        self.decode_data(log, &mut event, &mut diagnostics);

        match TopicPayload::parse(&event.topic) {
            Ok(payload) => {
                debug!(
                    public_key = %payload.public_key,
                    reference = %payload.reference,
                    "extracted topic payload"
                );
                event.payload = Some(payload);
            }
            Err(reason) => diagnostics.push(reason),
        }

        for diagnostic in &diagnostics {
            warn!(event = %self.name, tx_hash = %log.tx_hash, "{}", diagnostic);
        }

        Ok(Some(DecodedLog {
            summary: event.summary(&self.name),
            event,
            diagnostics,
        }))
    }

    fn decode_indexed(
        &self,
        log: &LogEvent,
        event: &mut DecodedEvent,
        diagnostics: &mut Vec<String>,
    ) -> Result<(), DecodeError> {
        let available = log.topics.len().saturating_sub(1);
        if available < self.indexed.len() {
            let mismatch = DecodeError::TopicCountMismatch {
                event: self.name.clone(),
                expected: self.indexed.len(),
                got: available,
            };
            if self.mode == DecodeMode::Strict {
                return Err(mismatch);
            }
            diagnostics.push(mismatch.to_string());
        }

        for (index, (slot, topic)) in self.indexed.iter().zip(&log.topics[1..]).enumerate() {
            match decode_topic(&slot.ty, topic) {
                Ok(value) => assign(slot, &value, event, diagnostics),
                Err(reason) => diagnostics.push(
                    DecodeError::Topic {
                        index: index + 1,
                        reason,
                    }
                    .to_string(),
                ),
            }
        }
        Ok(())
    }

    fn decode_data(&self, log: &LogEvent, event: &mut DecodedEvent, diagnostics: &mut Vec<String>) {
        if self.data.is_empty() {
            return;
        }

        let values = match self.data_type.abi_decode_params(&log.data) {
            Ok(DynSolValue::Tuple(values)) => values,
            Ok(other) => vec![other],
            Err(err) => {
                diagnostics.push(DecodeError::Payload(err.to_string()).to_string());
                return;
            }
        };

        for (slot, value) in self.data.iter().zip(values.iter()) {
            assign(slot, value, event, diagnostics);
        }
    }
}

fn assign(
    slot: &FieldSlot,
    value: &DynSolValue,
    event: &mut DecodedEvent,
    diagnostics: &mut Vec<String>,
) {
    let Some(setter) = slot.setter else {
        return;
    };
    if !setter(event, value) {
        diagnostics.push(
            DecodeError::FieldType {
                field: slot.name.clone(),
                kind: slot.kind.clone(),
            }
            .to_string(),
        );
    }
}

/// Decode one indexed topic
///
/// Reference types are stored as their keccak hash and come back as raw bytes.
fn decode_topic(ty: &DynSolType, topic: &B256) -> Result<DynSolValue, String> {
    match ty {
        DynSolType::String
        | DynSolType::Bytes
        | DynSolType::Array(_)
        | DynSolType::FixedArray(..)
        | DynSolType::Tuple(_) => Ok(DynSolValue::FixedBytes(*topic, 32)),
        _ => ty.abi_decode(topic.as_slice()).map_err(|err| err.to_string()),
    }
}

fn setter_for(name: &str) -> Option<FieldSetter> {
    match name {
        "from" | "sender" => Some(set_sender as FieldSetter),
        "to" | "target" => Some(set_target as FieldSetter),
        "owner" | "ownerParam" => Some(set_owner as FieldSetter),
        "actref" | "actRef" => Some(set_act_ref as FieldSetter),
        "topic" => Some(set_topic as FieldSetter),
        _ => None,
    }
}

fn set_sender(event: &mut DecodedEvent, value: &DynSolValue) -> bool {
    event.sender = value.as_address();
    event.sender.is_some()
}

fn set_target(event: &mut DecodedEvent, value: &DynSolValue) -> bool {
    event.target = value.as_address();
    event.target.is_some()
}

fn set_owner(event: &mut DecodedEvent, value: &DynSolValue) -> bool {
    event.owner = word_of(value);
    event.owner.is_some()
}

fn set_act_ref(event: &mut DecodedEvent, value: &DynSolValue) -> bool {
    event.act_ref = word_of(value);
    event.act_ref.is_some()
}

fn set_topic(event: &mut DecodedEvent, value: &DynSolValue) -> bool {
    match value.as_str() {
        Some(topic) => {
            event.topic = topic.to_string();
            true
        }
        None => false,
    }
}

fn word_of(value: &DynSolValue) -> Option<B256> {
    match value {
        DynSolValue::FixedBytes(word, _) => Some(*word),
        DynSolValue::Bytes(bytes) if bytes.len() <= 32 => Some(B256::right_padding_from(bytes)),
        DynSolValue::Uint(value, _) => Some(B256::from(*value)),
        _ => None,
    }
}
