//! Outbound `sendDataToTarget` request, its validation and the receipt

use alloy_primitives::{Address, B256};

use crate::domain::error::{EncodingError, ValidationError};
use crate::domain::event::{decode_hex_field, strip_hex_prefix, TopicPayload, TopicRecord};

/// Validated arguments for `sendDataToTarget`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub target: Address,
    /// Up to 32 bytes, right-padded when encoded
    pub owner: Vec<u8>,
    /// Up to 32 bytes, right-padded when encoded
    pub act_ref: Vec<u8>,
    pub topic: String,
}

impl TransactionRequest {
    pub fn owner_word(&self) -> Result<B256, EncodingError> {
        to_word("owner", &self.owner)
    }

    pub fn act_ref_word(&self) -> Result<B256, EncodingError> {
        to_word("actRef", &self.act_ref)
    }
}

/// Confirmed, successful submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
}

/// How the topic string is built from a key and a reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TopicFormat {
    /// `publicKeyHex || referenceHex`
    #[default]
    Legacy,
    /// [`TopicRecord`] behind its prefix
    Tagged,
}

/// Topic as entered by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicInput {
    /// Sent verbatim
    Raw(String),
    /// Public key and reference, both hex
    Parts {
        public_key: String,
        reference: String,
        format: TopicFormat,
    },
}

/// Raw strings from the send form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendDataForm {
    pub target: String,
    pub owner: String,
    pub act_ref: String,
    pub topic: TopicInput,
}

impl SendDataForm {
    /// Check every field and build the request; no network access happens here
    pub fn validate(&self) -> Result<TransactionRequest, ValidationError> {
        let target = parse_address("target", &self.target)?;
        let owner = parse_address("owner", &self.owner)?;

        // An empty reference is sent as the zero word
        let act_ref = if strip_hex_prefix(&self.act_ref).is_empty() {
            Vec::new()
        } else {
            decode_hex_field("ACT reference", &self.act_ref)?
        };
        if act_ref.len() > 32 {
            return Err(ValidationError::TooLong {
                field: "ACT reference",
                len: act_ref.len(),
                max: 32,
            });
        }

        let topic = match &self.topic {
            TopicInput::Raw(topic) => topic.clone(),
            TopicInput::Parts {
                public_key,
                reference,
                format: TopicFormat::Legacy,
            } => TopicPayload::compose(public_key, reference)?,
            TopicInput::Parts {
                public_key,
                reference,
                format: TopicFormat::Tagged,
            } => TopicRecord::from_hex(public_key, reference)?.to_topic_string(),
        };

        Ok(TransactionRequest {
            target,
            owner: owner.to_vec(),
            act_ref,
            topic,
        })
    }
}

/// Parse a 20-byte hex address, `0x` prefix optional
pub fn parse_address(field: &'static str, value: &str) -> Result<Address, ValidationError> {
    let bytes = decode_hex_field(field, value).map_err(|_| ValidationError::InvalidAddress {
        field,
        value: value.to_string(),
    })?;
    if bytes.len() != 20 {
        return Err(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
    Ok(Address::from_slice(&bytes))
}

/// Left-align `bytes` in a 32-byte slot
pub fn to_word(field: &'static str, bytes: &[u8]) -> Result<B256, EncodingError> {
    if bytes.len() > 32 {
        return Err(EncodingError::Oversized {
            field,
            len: bytes.len(),
        });
    }
    Ok(B256::right_padding_from(bytes))
}
