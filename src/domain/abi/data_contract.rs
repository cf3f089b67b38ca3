//! Embedded definition of the data notification contract

use alloy_primitives::{address, Address};

use crate::domain::abi::ContractDescriptor;
use crate::domain::error::ParseError;

/// Event emitted for every data pointer sent to a target
pub const DATA_SENT_EVENT: &str = "DataSentToTarget";

/// Function that emits [`DATA_SENT_EVENT`]
pub const SEND_DATA_FUNCTION: &str = "sendDataToTarget";

/// Read-only accessor for the contract administrator
pub const GET_ADMIN_FUNCTION: &str = "getAdmin";

/// Deployed contract on Gnosis chain
pub const DEFAULT_CONTRACT_ADDRESS: Address = address!("0x242A2174fa8d8586a784aBdB4fF03C3181E96bee");

pub const DATA_CONTRACT_ABI: &str = r#"[
  {
    "inputs": [],
    "stateMutability": "nonpayable",
    "type": "constructor"
  },
  {
    "inputs": [
      {
        "internalType": "address",
        "name": "owner",
        "type": "address"
      }
    ],
    "name": "OwnableInvalidOwner",
    "type": "error"
  },
  {
    "inputs": [
      {
        "internalType": "address",
        "name": "account",
        "type": "address"
      }
    ],
    "name": "OwnableUnauthorizedAccount",
    "type": "error"
  },
  {
    "anonymous": false,
    "inputs": [
      {
        "indexed": true,
        "internalType": "address",
        "name": "from",
        "type": "address"
      },
      {
        "indexed": true,
        "internalType": "address",
        "name": "to",
        "type": "address"
      },
      {
        "indexed": false,
        "internalType": "bytes32",
        "name": "owner",
        "type": "bytes32"
      },
      {
        "indexed": false,
        "internalType": "bytes32",
        "name": "actref",
        "type": "bytes32"
      },
      {
        "indexed": false,
        "internalType": "string",
        "name": "topic",
        "type": "string"
      }
    ],
    "name": "DataSentToTarget",
    "type": "event"
  },
  {
    "anonymous": false,
    "inputs": [
      {
        "indexed": true,
        "internalType": "address",
        "name": "previousOwner",
        "type": "address"
      },
      {
        "indexed": true,
        "internalType": "address",
        "name": "newOwner",
        "type": "address"
      }
    ],
    "name": "OwnershipTransferred",
    "type": "event"
  },
  {
    "inputs": [],
    "name": "getAdmin",
    "outputs": [
      {
        "internalType": "address",
        "name": "",
        "type": "address"
      }
    ],
    "stateMutability": "view",
    "type": "function"
  },
  {
    "inputs": [],
    "name": "owner",
    "outputs": [
      {
        "internalType": "address",
        "name": "",
        "type": "address"
      }
    ],
    "stateMutability": "view",
    "type": "function"
  },
  {
    "inputs": [],
    "name": "renounceOwnership",
    "outputs": [],
    "stateMutability": "nonpayable",
    "type": "function"
  },
  {
    "inputs": [
      {
        "internalType": "address",
        "name": "target",
        "type": "address"
      },
      {
        "internalType": "bytes32",
        "name": "ownerParam",
        "type": "bytes32"
      },
      {
        "internalType": "bytes32",
        "name": "actref",
        "type": "bytes32"
      },
      {
        "internalType": "string",
        "name": "topic",
        "type": "string"
      }
    ],
    "name": "sendDataToTarget",
    "outputs": [],
    "stateMutability": "nonpayable",
    "type": "function"
  },
  {
    "inputs": [
      {
        "internalType": "address",
        "name": "newOwner",
        "type": "address"
      }
    ],
    "name": "transferOwnership",
    "outputs": [],
    "stateMutability": "nonpayable",
    "type": "function"
  }
]"#;

/// Parse the embedded ABI and check the names this crate depends on
pub fn descriptor() -> Result<ContractDescriptor, ParseError> {
    ContractDescriptor::parse(DATA_CONTRACT_ABI)?
        .require(&[DATA_SENT_EVENT], &[SEND_DATA_FUNCTION, GET_ADMIN_FUNCTION])
}
