//! ABI registry - the parsed, read-only contract interface

use std::collections::HashMap;

use alloy_dyn_abi::DynSolType;
use alloy_json_abi::{EventParam, JsonAbi, Param, StateMutability};
use alloy_primitives::B256;

use crate::domain::error::ParseError;

/// A typed parameter of an event or function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name (may be empty)
    pub name: String,
    /// Canonical Solidity type (e.g., "address", "bytes32", "(uint256,address)")
    pub kind: String,
    /// Resolved dynamic type used for encoding and decoding
    pub ty: DynSolType,
    /// Whether the parameter travels in a topic (events only)
    pub indexed: bool,
}

impl ParamSpec {
    fn from_event_param(item: &str, param: &EventParam) -> Result<Self, ParseError> {
        let kind = param.selector_type().into_owned();
        Ok(Self {
            ty: resolve_type(item, &param.name, &kind)?,
            name: param.name.clone(),
            kind,
            indexed: param.indexed,
        })
    }

    fn from_param(item: &str, param: &Param) -> Result<Self, ParseError> {
        let kind = param.selector_type().into_owned();
        Ok(Self {
            ty: resolve_type(item, &param.name, &kind)?,
            name: param.name.clone(),
            kind,
            indexed: false,
        })
    }
}

/// An event with its signature hash (topic 0)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    pub name: String,
    /// Canonical signature, e.g. "DataSentToTarget(address,address,bytes32,bytes32,string)"
    pub signature: String,
    /// keccak256 of the signature
    pub topic: B256,
    pub anonymous: bool,
    /// Parameters in declaration order
    pub params: Vec<ParamSpec>,
}

impl EventDescriptor {
    /// Indexed parameters in declaration order
    pub fn indexed(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.indexed)
    }

    /// Non-indexed parameters in declaration order
    pub fn non_indexed(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| !p.indexed)
    }

    pub fn indexed_count(&self) -> usize {
        self.indexed().count()
    }
}

/// A callable function with its 4-byte selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    /// Canonical signature, e.g. "sendDataToTarget(address,bytes32,bytes32,string)"
    pub signature: String,
    pub selector: [u8; 4],
    pub inputs: Vec<ParamSpec>,
    pub outputs: Vec<ParamSpec>,
    /// `view` or `pure`
    pub read_only: bool,
}

impl FunctionDescriptor {
    /// Get selector as hex string
    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }
}

/// Parsed contract interface, indexed by name
///
/// Built once and shared read-only afterwards; there is no mutation API.
#[derive(Debug, Clone, Default)]
pub struct ContractDescriptor {
    events: HashMap<String, EventDescriptor>,
    functions: HashMap<String, FunctionDescriptor>,
}

impl ContractDescriptor {
    /// Parse a JSON ABI definition
    ///
    /// Overloaded names keep their first definition.
    pub fn parse(abi_json: &str) -> Result<Self, ParseError> {
        let abi: JsonAbi = serde_json::from_str(abi_json)?;
        let mut descriptor = Self::default();

        for (name, overloads) in &abi.events {
            let Some(event) = overloads.first() else {
                continue;
            };
            let params = event
                .inputs
                .iter()
                .map(|param| ParamSpec::from_event_param(name, param))
                .collect::<Result<Vec<_>, _>>()?;
            descriptor.events.insert(
                name.clone(),
                EventDescriptor {
                    name: name.clone(),
                    signature: event.signature(),
                    topic: event.selector(),
                    anonymous: event.anonymous,
                    params,
                },
            );
        }

        for (name, overloads) in &abi.functions {
            let Some(function) = overloads.first() else {
                continue;
            };
            let inputs = function
                .inputs
                .iter()
                .map(|param| ParamSpec::from_param(name, param))
                .collect::<Result<Vec<_>, _>>()?;
            let outputs = function
                .outputs
                .iter()
                .map(|param| ParamSpec::from_param(name, param))
                .collect::<Result<Vec<_>, _>>()?;
            descriptor.functions.insert(
                name.clone(),
                FunctionDescriptor {
                    name: name.clone(),
                    signature: function.signature(),
                    selector: function.selector().0,
                    inputs,
                    outputs,
                    read_only: matches!(
                        function.state_mutability,
                        StateMutability::View | StateMutability::Pure
                    ),
                },
            );
        }

        Ok(descriptor)
    }

    /// Fail unless every named event and function is present
    pub fn require(self, events: &[&str], functions: &[&str]) -> Result<Self, ParseError> {
        if let Some(missing) = events.iter().find(|name| !self.events.contains_key(**name)) {
            return Err(ParseError::MissingEvent(missing.to_string()));
        }
        if let Some(missing) = functions
            .iter()
            .find(|name| !self.functions.contains_key(**name))
        {
            return Err(ParseError::MissingFunction(missing.to_string()));
        }
        Ok(self)
    }

    pub fn event_by_name(&self, name: &str) -> Option<&EventDescriptor> {
        self.events.get(name)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    /// Look up an event by its signature hash
    pub fn event_by_topic(&self, topic: &B256) -> Option<&EventDescriptor> {
        self.events
            .values()
            .find(|event| !event.anonymous && &event.topic == topic)
    }

    pub fn events(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.events.values()
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values()
    }
}

fn resolve_type(item: &str, param: &str, kind: &str) -> Result<DynSolType, ParseError> {
    DynSolType::parse(kind).map_err(|err| ParseError::InvalidType {
        item: item.to_string(),
        param: param.to_string(),
        kind: kind.to_string(),
        reason: err.to_string(),
    })
}
