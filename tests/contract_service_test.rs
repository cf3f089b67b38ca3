//! Contract service send and read paths against an in-memory chain client

mod common;

use std::sync::Arc;

use activate::domain::error::{ChainError, ContractError, ValidationError};
use activate::domain::{SendDataForm, TopicFormat, TopicInput, TransactionRequest};
use activate::infrastructure::abi::DecodeMode;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::{sol, SolCall};

use common::{service, MockChainClient};

sol! {
    function sendDataToTarget(address target, bytes32 ownerParam, bytes32 actref, string topic);
    function getAdmin() returns (address);
}

fn form(act_ref: &str) -> SendDataForm {
    SendDataForm {
        target: "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".into(),
        owner: "0x5225c07Ec3ba1D5fE360459fE5B9C2Db28b35c9B".into(),
        act_ref: act_ref.into(),
        topic: TopicInput::Parts {
            public_key: format!("04{}", "a".repeat(128)),
            reference: "b".repeat(64),
            format: TopicFormat::Legacy,
        },
    }
}

#[tokio::test]
async fn test_odd_act_ref_never_reaches_chain() {
    let client = Arc::new(MockChainClient::new());
    let service = service(client.clone(), DecodeMode::Lenient);

    let err = service.submit_form(&form("0xabc")).await.unwrap_err();
    assert!(matches!(
        err,
        ContractError::Validation(ValidationError::OddLength { .. })
    ));
    assert_eq!(client.sends(), 0);
}

#[tokio::test]
async fn test_submit_form_encodes_padded_words() {
    let client = Arc::new(MockChainClient::new());
    let service = service(client.clone(), DecodeMode::Lenient);

    let receipt = service
        .submit_form(&form(&"22".repeat(16)))
        .await
        .unwrap();
    assert_eq!(receipt.block_number, 42);
    assert_eq!(client.sends(), 1);

    let calldata = client.calldata.lock().unwrap()[0].clone();
    let call = sendDataToTargetCall::abi_decode(&calldata).unwrap();
    assert_eq!(call.target, Address::repeat_byte(0xaa));

    // Owner address left-aligned, actRef right-padded to 32 bytes
    let owner: Address = "0x5225c07Ec3ba1D5fE360459fE5B9C2Db28b35c9B".parse().unwrap();
    assert_eq!(&call.ownerParam[..20], owner.as_slice());
    assert!(call.ownerParam[20..].iter().all(|b| *b == 0));
    assert_eq!(&call.actref[..16], &[0x22; 16]);
    assert!(call.actref[16..].iter().all(|b| *b == 0));
    assert_eq!(call.topic, format!("04{}{}", "a".repeat(128), "b".repeat(64)));
}

#[tokio::test]
async fn test_empty_act_ref_sends_zero_word() {
    let client = Arc::new(MockChainClient::new());
    let service = service(client.clone(), DecodeMode::Lenient);

    service.submit_form(&form("")).await.unwrap();
    assert_eq!(client.sends(), 1);

    let calldata = client.calldata.lock().unwrap()[0].clone();
    let call = sendDataToTargetCall::abi_decode(&calldata).unwrap();
    assert_eq!(call.actref, B256::ZERO);
}

#[tokio::test]
async fn test_send_matches_static_encoding() {
    let client = Arc::new(MockChainClient::new());
    let service = service(client.clone(), DecodeMode::Lenient);
    let request = TransactionRequest {
        target: Address::repeat_byte(0x01),
        owner: vec![0x33; 32],
        act_ref: vec![0x44; 32],
        topic: "plain".into(),
    };

    service.send_data_to_target(&request).await.unwrap();

    let expected = sendDataToTargetCall {
        target: request.target,
        ownerParam: B256::repeat_byte(0x33),
        actref: B256::repeat_byte(0x44),
        topic: "plain".into(),
    }
    .abi_encode();
    assert_eq!(client.calldata.lock().unwrap()[0].to_vec(), expected);
}

#[tokio::test]
async fn test_oversized_word_is_an_encoding_error() {
    let client = Arc::new(MockChainClient::new());
    let service = service(client.clone(), DecodeMode::Lenient);
    let request = TransactionRequest {
        target: Address::ZERO,
        owner: vec![0x33; 33],
        act_ref: Vec::new(),
        topic: String::new(),
    };

    let err = service.send_data_to_target(&request).await.unwrap_err();
    assert!(matches!(err, ContractError::Encoding(_)));
    assert_eq!(client.sends(), 0);
}

#[tokio::test]
async fn test_revert_surfaces() {
    let client = Arc::new(MockChainClient {
        revert: true,
        ..Default::default()
    });
    let service = service(client.clone(), DecodeMode::Lenient);

    let err = service
        .submit_form(&form(&"22".repeat(32)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ContractError::Chain(ChainError::Revert {
            block_number: 42,
            ..
        })
    ));
}

#[tokio::test]
async fn test_admin_decodes_address() {
    let admin = Address::repeat_byte(0x42);
    let client = Arc::new(MockChainClient {
        call_output: Bytes::from(
            DynSolValue::Tuple(vec![DynSolValue::Address(admin)]).abi_encode_params(),
        ),
        ..Default::default()
    });
    let service = service(client, DecodeMode::Lenient);

    assert_eq!(service.admin().await.unwrap(), admin);
    assert_eq!(
        service
            .descriptor()
            .function_by_name("getAdmin")
            .unwrap()
            .selector,
        getAdminCall::SELECTOR
    );
}

#[tokio::test]
async fn test_admin_rejects_garbage_output() {
    let client = Arc::new(MockChainClient {
        call_output: Bytes::from(vec![0x01, 0x02]),
        ..Default::default()
    });
    let service = service(client, DecodeMode::Lenient);

    assert!(matches!(
        service.admin().await.unwrap_err(),
        ContractError::Output { .. }
    ));
}
