//! Log and decoded event models, including the composite topic payload

use alloy_primitives::{Address, Bytes, B256};

use crate::domain::error::{DecodeError, ValidationError};

/// Minimum composite topic length: 130-char key + 64-char reference
pub const COMPOSITE_TOPIC_MIN_LEN: usize = 194;

/// Hex length of an uncompressed SEC1 key (`04` || X || Y)
pub const UNCOMPRESSED_KEY_HEX_LEN: usize = 130;

/// Hex length of a raw X || Y key without prefix
pub const RAW_KEY_HEX_LEN: usize = 128;

/// Hex length of a 32-byte reference
pub const REFERENCE_HEX_LEN: usize = 64;

/// Marker that introduces a [`TopicRecord`] inside the topic string
pub const TOPIC_RECORD_PREFIX: &str = "rec1:";

/// Raw log as delivered by the chain adapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEvent {
    pub address: Address,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
    /// topic[0] is the event signature hash
    pub topics: Vec<B256>,
    /// ABI encoded non-indexed parameters
    pub data: Bytes,
    /// Log was dropped by a chain reorganisation
    pub removed: bool,
}

/// Encoding of the public key carried in a topic payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    /// SEC1 uncompressed, `04` || X || Y
    Uncompressed,
    /// SEC1 compressed, `02`/`03` || X
    Compressed,
    /// X || Y without a prefix byte
    Raw,
}

impl KeyFormat {
    /// Record tag; matches the SEC1 prefix where one exists
    fn tag(self, key: &[u8]) -> u8 {
        match self {
            KeyFormat::Uncompressed => 0x04,
            KeyFormat::Compressed => key.first().copied().unwrap_or(0x02),
            KeyFormat::Raw => 0x00,
        }
    }

    /// Key body length in bytes following the tag
    fn body_len(tag: u8) -> Option<usize> {
        match tag {
            0x04 | 0x00 => Some(64),
            0x02 | 0x03 => Some(32),
            _ => None,
        }
    }
}

/// Public key and reference extracted from the topic string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPayload {
    /// Hex encoded public key (SEC1 prefix included when present)
    pub public_key: String,
    /// Hex encoded 32-byte reference
    pub reference: String,
    pub key_format: KeyFormat,
}

impl TopicPayload {
    /// Split a `publicKeyHex || referenceHex` string
    ///
    /// Keys beginning with `04` take 130 characters, anything else 128.
    /// Strings under [`COMPOSITE_TOPIC_MIN_LEN`] are rejected.
    pub fn parse_composite(topic: &str) -> Result<Self, String> {
        if topic.len() < COMPOSITE_TOPIC_MIN_LEN {
            return Err(format!(
                "topic string too short ({} chars) to contain publicKey + 32-byte hex",
                topic.len()
            ));
        }
        if !topic.is_ascii() {
            return Err("topic string is not ASCII hex".to_string());
        }

        let (key_len, key_format) = if topic.starts_with("04") {
            (UNCOMPRESSED_KEY_HEX_LEN, KeyFormat::Uncompressed)
        } else {
            (RAW_KEY_HEX_LEN, KeyFormat::Raw)
        };
        let end = (key_len + REFERENCE_HEX_LEN).min(topic.len());

        Ok(Self {
            public_key: topic[..key_len].to_string(),
            reference: topic[key_len..end].to_string(),
            key_format,
        })
    }

    /// Parse either a tagged record or a legacy composite string
    pub fn parse(topic: &str) -> Result<Self, String> {
        if topic.starts_with(TOPIC_RECORD_PREFIX) {
            let record = TopicRecord::parse(topic).map_err(|err| err.to_string())?;
            return Ok(record.payload());
        }
        Self::parse_composite(topic)
    }

    /// Build the legacy composite string from its two hex parts
    pub fn compose(public_key: &str, reference: &str) -> Result<String, ValidationError> {
        let public_key = strip_hex_prefix(public_key);
        let reference = strip_hex_prefix(reference);
        check_hex("public key", public_key)?;
        check_hex("reference", reference)?;

        let expected_key = if public_key.starts_with("04") {
            UNCOMPRESSED_KEY_HEX_LEN
        } else {
            RAW_KEY_HEX_LEN
        };
        if public_key.len() != expected_key {
            return Err(ValidationError::WrongLength {
                field: "public key",
                expected: expected_key,
                got: public_key.len(),
            });
        }
        if reference.len() != REFERENCE_HEX_LEN {
            return Err(ValidationError::WrongLength {
                field: "reference",
                expected: REFERENCE_HEX_LEN,
                got: reference.len(),
            });
        }
        Ok(format!("{}{}", public_key, reference))
    }
}

/// Tagged binary form of the topic payload: `[tag][key body][reference:32]`
///
/// Only built through [`from_hex`](Self::from_hex) or [`decode`](Self::decode),
/// so the key length always matches its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRecord {
    key_format: KeyFormat,
    /// Key bytes including the SEC1 prefix for compressed/uncompressed keys
    public_key: Vec<u8>,
    reference: B256,
}

impl TopicRecord {
    pub fn key_format(&self) -> KeyFormat {
        self.key_format
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn reference(&self) -> B256 {
        self.reference
    }

    /// Build a record from hex parts; the key format follows the key length
    pub fn from_hex(public_key: &str, reference: &str) -> Result<Self, ValidationError> {
        let key = decode_hex_field("public key", public_key)?;
        let reference_bytes = decode_hex_field("reference", reference)?;
        if reference_bytes.len() != 32 {
            return Err(ValidationError::WrongLength {
                field: "reference",
                expected: REFERENCE_HEX_LEN,
                got: reference_bytes.len() * 2,
            });
        }

        let key_format = match (key.len(), key.first().copied()) {
            (65, Some(0x04)) => KeyFormat::Uncompressed,
            (33, Some(0x02 | 0x03)) => KeyFormat::Compressed,
            (64, _) => KeyFormat::Raw,
            (len, _) => {
                return Err(ValidationError::InvalidHex {
                    field: "public key",
                    reason: format!("{} bytes is not a recognised key encoding", len),
                })
            }
        };

        Ok(Self {
            key_format,
            public_key: key,
            reference: B256::from_slice(&reference_bytes),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let tag = self.key_format.tag(&self.public_key);
        let body = match self.key_format {
            KeyFormat::Raw => &self.public_key[..],
            _ => &self.public_key[1..],
        };
        let mut out = Vec::with_capacity(1 + body.len() + 32);
        out.push(tag);
        out.extend_from_slice(body);
        out.extend_from_slice(self.reference.as_slice());
        out
    }

    /// String form carried in the event's `topic` field
    pub fn to_topic_string(&self) -> String {
        format!("{}{}", TOPIC_RECORD_PREFIX, hex::encode(self.encode()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| DecodeError::TopicRecord("empty record".into()))?;
        let body_len = KeyFormat::body_len(tag)
            .ok_or_else(|| DecodeError::TopicRecord(format!("unknown tag 0x{:02x}", tag)))?;
        if rest.len() != body_len + 32 {
            return Err(DecodeError::TopicRecord(format!(
                "tag 0x{:02x} needs {} bytes, got {}",
                tag,
                body_len + 32,
                rest.len()
            )));
        }

        let (body, reference) = rest.split_at(body_len);
        let (key_format, public_key) = match tag {
            0x00 => (KeyFormat::Raw, body.to_vec()),
            0x04 => (KeyFormat::Uncompressed, [&[tag][..], body].concat()),
            _ => (KeyFormat::Compressed, [&[tag][..], body].concat()),
        };

        Ok(Self {
            key_format,
            public_key,
            reference: B256::from_slice(reference),
        })
    }

    pub fn parse(topic: &str) -> Result<Self, DecodeError> {
        let encoded = topic
            .strip_prefix(TOPIC_RECORD_PREFIX)
            .ok_or_else(|| DecodeError::TopicRecord("missing record prefix".into()))?;
        let bytes =
            hex::decode(encoded).map_err(|err| DecodeError::TopicRecord(err.to_string()))?;
        Self::decode(&bytes)
    }

    pub fn payload(&self) -> TopicPayload {
        TopicPayload {
            public_key: hex::encode(&self.public_key),
            reference: hex::encode(self.reference),
            key_format: self.key_format,
        }
    }
}

/// Structured `DataSentToTarget` event
///
/// Fields that could not be extracted stay `None` (or empty for `topic`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedEvent {
    pub block_number: u64,
    pub tx_hash: B256,
    /// Indexed `from`
    pub sender: Option<Address>,
    /// Indexed `to`
    pub target: Option<Address>,
    pub owner: Option<B256>,
    pub act_ref: Option<B256>,
    pub topic: String,
    /// Parts of `topic`, when it carries a key and a reference
    pub payload: Option<TopicPayload>,
}

impl DecodedEvent {
    /// Owner slot read as a left-aligned address (trailing 12 bytes zero)
    pub fn owner_address(&self) -> Option<Address> {
        let owner = self.owner?;
        if owner[20..].iter().all(|b| *b == 0) {
            Some(Address::from_slice(&owner[..20]))
        } else {
            None
        }
    }

    /// One-line description built from the fields that were extracted
    pub fn summary(&self, event_name: &str) -> String {
        let mut msg = format!("'{}' Event! Block: {}.", event_name, self.block_number);
        if let Some(target) = self.target.filter(|t| !t.is_zero()) {
            msg.push_str(&format!(" Target: {}.", target.to_checksum(None)));
        }
        if let Some(owner) = self.owner {
            msg.push_str(&format!(" Owner: 0x{}.", hex::encode(owner)));
        }
        if let Some(act_ref) = self.act_ref {
            msg.push_str(&format!(" ActRef: 0x{}.", hex::encode(act_ref)));
        }
        if !self.topic.is_empty() {
            msg.push_str(&format!(" Topic: '{}'.", self.topic));
        }
        msg
    }
}

pub(crate) fn strip_hex_prefix(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

fn check_hex(field: &'static str, payload: &str) -> Result<(), ValidationError> {
    if payload.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if payload.len() % 2 != 0 {
        return Err(ValidationError::OddLength { field });
    }
    if let Some(bad) = payload.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidHex {
            field,
            reason: format!("invalid character '{}'", bad),
        });
    }
    Ok(())
}

/// Strip `0x`, check even length, then hex decode
pub(crate) fn decode_hex_field(
    field: &'static str,
    value: &str,
) -> Result<Vec<u8>, ValidationError> {
    let payload = strip_hex_prefix(value);
    check_hex(field, payload)?;
    hex::decode(payload).map_err(|err| ValidationError::InvalidHex {
        field,
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uncompressed_topic() -> String {
        format!("04{}{}", "a".repeat(128), "b".repeat(64))
    }

    #[test]
    fn test_composite_uncompressed_key() {
        let topic = uncompressed_topic();
        assert_eq!(topic.len(), 194);

        let payload = TopicPayload::parse_composite(&topic).unwrap();
        assert_eq!(payload.public_key.len(), 130);
        assert!(payload.public_key.starts_with("04"));
        assert_eq!(payload.public_key, format!("04{}", "a".repeat(128)));
        assert_eq!(payload.reference, "b".repeat(64));
        assert_eq!(payload.key_format, KeyFormat::Uncompressed);
    }

    #[test]
    fn test_composite_raw_key() {
        let topic = format!("{}{}{}", "c".repeat(128), "d".repeat(64), "ee");
        let payload = TopicPayload::parse_composite(&topic).unwrap();
        assert_eq!(payload.public_key, "c".repeat(128));
        assert_eq!(payload.reference, "d".repeat(64));
        assert_eq!(payload.key_format, KeyFormat::Raw);
    }

    #[test]
    fn test_composite_too_short() {
        let topic = "a".repeat(100);
        let err = TopicPayload::parse(&topic).unwrap_err();
        assert!(err.contains("too short (100 chars)"));
    }

    #[test]
    fn test_composite_non_ascii_is_rejected() {
        let topic = format!("04{}é{}", "a".repeat(128), "b".repeat(64));
        assert!(TopicPayload::parse_composite(&topic).is_err());
    }

    #[test]
    fn test_compose_validates_parts() {
        let key = format!("0x04{}", "a".repeat(128));
        let composed = TopicPayload::compose(&key, &"b".repeat(64)).unwrap();
        assert_eq!(composed, uncompressed_topic());

        assert_eq!(
            TopicPayload::compose(&"a".repeat(127), &"b".repeat(64)),
            Err(ValidationError::OddLength { field: "public key" })
        );
        assert!(matches!(
            TopicPayload::compose(&"a".repeat(128), &"b".repeat(62)),
            Err(ValidationError::WrongLength { field: "reference", .. })
        ));
    }

    #[test]
    fn test_record_uncompressed() {
        let key = format!("04{}", "a".repeat(128));
        let record = TopicRecord::from_hex(&key, &"b".repeat(64)).unwrap();
        assert_eq!(record.key_format(), KeyFormat::Uncompressed);
        assert_eq!(record.public_key().len(), 65);
        assert_eq!(record.reference(), B256::repeat_byte(0xbb));
        assert_eq!(record.encode().len(), 97);

        let topic = record.to_topic_string();
        assert!(topic.starts_with(TOPIC_RECORD_PREFIX));
        let payload = TopicPayload::parse(&topic).unwrap();
        assert_eq!(payload.public_key, key);
        assert_eq!(payload.reference, "b".repeat(64));
    }

    #[test]
    fn test_record_compressed_and_raw() {
        let compressed = format!("03{}", "1".repeat(64));
        let record = TopicRecord::from_hex(&compressed, &"2".repeat(64)).unwrap();
        assert_eq!(record.key_format, KeyFormat::Compressed);
        assert_eq!(record.encode()[0], 0x03);
        assert_eq!(TopicRecord::decode(&record.encode()).unwrap(), record);

        let raw = "3".repeat(128);
        let record = TopicRecord::from_hex(&raw, &"4".repeat(64)).unwrap();
        assert_eq!(record.key_format, KeyFormat::Raw);
        assert_eq!(record.encode()[0], 0x00);
        assert_eq!(record.payload().public_key, raw);
    }

    #[test]
    fn test_record_rejects_missing_key() {
        assert!(matches!(
            TopicRecord::from_hex("", &"b".repeat(64)),
            Err(ValidationError::Empty { field: "public key" })
        ));
        assert!(matches!(
            TopicRecord::from_hex("04", &"b".repeat(64)),
            Err(ValidationError::InvalidHex { field: "public key", .. })
        ));
    }

    #[test]
    fn test_record_rejects_bad_tag_and_length() {
        let err = TopicRecord::decode(&[0x07; 97]).unwrap_err();
        assert!(matches!(err, DecodeError::TopicRecord(msg) if msg.contains("unknown tag")));

        let err = TopicRecord::decode(&[0x04; 40]).unwrap_err();
        assert!(matches!(err, DecodeError::TopicRecord(_)));

        assert!(TopicPayload::parse("rec1:zz").is_err());
    }

    #[test]
    fn test_summary_omits_missing_fields() {
        let event = DecodedEvent {
            block_number: 42,
            owner: Some(B256::repeat_byte(0x11)),
            ..Default::default()
        };
        let summary = event.summary("DataSentToTarget");
        assert_eq!(
            summary,
            format!(
                "'DataSentToTarget' Event! Block: 42. Owner: 0x{}.",
                "11".repeat(32)
            )
        );
    }

    #[test]
    fn test_owner_address_left_aligned() {
        let addr = Address::repeat_byte(0x5a);
        let event = DecodedEvent {
            owner: Some(B256::right_padding_from(addr.as_slice())),
            ..Default::default()
        };
        assert_eq!(event.owner_address(), Some(addr));

        let event = DecodedEvent {
            owner: Some(B256::repeat_byte(0x22)),
            ..Default::default()
        };
        assert_eq!(event.owner_address(), None);
    }

    #[test]
    fn test_decode_hex_field() {
        assert_eq!(decode_hex_field("ref", "0xabcd").unwrap(), vec![0xab, 0xcd]);
        assert_eq!(
            decode_hex_field("ref", "abc"),
            Err(ValidationError::OddLength { field: "ref" })
        );
        assert!(matches!(
            decode_hex_field("ref", "zz"),
            Err(ValidationError::InvalidHex { .. })
        ));
    }
}
