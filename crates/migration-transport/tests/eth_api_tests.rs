//! Typed eth helpers driven through the scripted mock client.

use migration_transport::{EthApi, MockRpcClient, RpcClient};
use migration_verifier_types::{Address, BlockTag, Bytes, TransactionRequest, VerifyError, H256};
use serde_json::json;

const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

fn contract() -> Address {
    CONTRACT.parse().unwrap()
}

#[tokio::test]
async fn test_block_number_and_checkpoint() {
    let mock = MockRpcClient::target();
    mock.respond("eth_blockNumber", json!("0x2a"));
    mock.respond(
        "eth_getBlockByNumber",
        json!({ "number": "0x2a", "hash": format!("0x{}", "ab".repeat(32)), "transactions": [] }),
    );

    assert_eq!(mock.block_number().await.unwrap(), 42);
    let cp = mock
        .block_checkpoint(BlockTag::Number(42))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cp.height, 42);
    assert_eq!(cp.hash.0, [0xab; 32]);

    let calls = mock.calls();
    assert_eq!(calls[1].params, vec![json!("0x2a"), json!(false)]);
}

#[tokio::test]
async fn test_eth_call_and_storage_params() {
    let mock = MockRpcClient::target();
    mock.respond("eth_call", json!("0x0000000000000000000000000000000000000000000000000000000000000001"));
    mock.respond("eth_getStorageAt", json!("0x0000000000000000000000000000000000000000000000000000000000000064"));

    let req = TransactionRequest::call(contract(), vec![0x12, 0x34, 0x56, 0x78]);
    let out = mock.eth_call(&req, BlockTag::Latest).await.unwrap();
    assert_eq!(out.len(), 32);
    assert_eq!(out.as_slice()[31], 1);

    let word = mock
        .storage_at(&contract(), &H256::default(), BlockTag::Latest)
        .await
        .unwrap();
    assert_eq!(word, H256::from_word(&[0x64]).unwrap());

    let calls = mock.calls();
    assert_eq!(
        calls[0].params,
        vec![json!({ "to": CONTRACT, "data": "0x12345678" }), json!("latest")]
    );
    assert_eq!(calls[1].params[0], json!(CONTRACT));
}

#[tokio::test]
async fn test_balance_is_canonical_bytes() {
    let mock = MockRpcClient::source();
    mock.respond("eth_getBalance", json!("0x0de0b6b3a7640000"));
    let bal = mock.balance(&contract(), BlockTag::Latest).await.unwrap();
    assert_eq!(bal, Bytes::new(vec![0x0d, 0xe0, 0xb6, 0xb3, 0xa7, 0x64, 0x00, 0x00]));
}

#[tokio::test]
async fn test_receipt_null_is_pending() {
    let mock = MockRpcClient::target();
    mock.respond("eth_getTransactionReceipt", json!(null));
    let receipt = mock.transaction_receipt(&H256::default()).await.unwrap();
    assert!(receipt.is_none());
}

#[tokio::test]
async fn test_malformed_and_remote_errors() {
    let mock = MockRpcClient::target();
    mock.respond("eth_blockNumber", json!(42));
    let err = mock.block_number().await.unwrap_err();
    assert!(matches!(err, VerifyError::MalformedResponse { .. }));

    mock.fail_remote("eth_call", 3, "execution reverted");
    let err = mock
        .eth_call(&TransactionRequest::call(contract(), vec![]), BlockTag::Latest)
        .await
        .unwrap_err();
    match err {
        VerifyError::Rpc(e) => {
            assert_eq!(e.code, Some(3));
            assert_eq!(e.message, "execution reverted");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_dyn_client_gets_eth_api() {
    let mock = MockRpcClient::target();
    mock.respond("eth_getCode", json!("0x6080"));
    let client: std::sync::Arc<dyn RpcClient> = std::sync::Arc::new(mock);
    let code = client.code(&contract(), BlockTag::Latest).await.unwrap();
    assert_eq!(code, Bytes::new(vec![0x60, 0x80]));
}
