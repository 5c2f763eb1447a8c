//! State diff fetcher behavior against scripted endpoints.

use std::sync::Arc;

use migration_state_fetcher::{
    StateDiffFetcher, DEBUG_CALL_METHOD, DEBUG_REPLAY_METHOD, HASH_CORRELATION_METHOD,
    STATE_CHANGES_METHOD,
};
use migration_transport::MockRpcClient;
use migration_verifier_types::{Address, TransactionKind, TransactionRequest, VerifyError, H256};
use serde_json::json;

const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

fn word(n: u64) -> String {
    format!("0x{:064x}", n)
}

struct Fixture {
    web3: MockRpcClient,
    native: MockRpcClient,
    target: MockRpcClient,
}

impl Fixture {
    fn new() -> Self {
        Self {
            web3: MockRpcClient::source(),
            native: MockRpcClient::source(),
            target: MockRpcClient::target(),
        }
    }

    fn fetcher(&self) -> StateDiffFetcher {
        StateDiffFetcher::new(
            Arc::new(self.web3.clone()),
            Arc::new(self.native.clone()),
            Arc::new(self.target.clone()),
        )
    }
}

#[tokio::test]
async fn test_fetch_source_diff_decodes_and_hits_native_endpoint() {
    let fx = Fixture::new();
    fx.native.respond(
        STATE_CHANGES_METHOD,
        json!({
            "smt_stat": { "update_kvs": 3, "update_milliseconds": 1 },
            "transactions": [{
                "tx_hash": word(0xbb),
                "type": "eth",
                "events": [{ "id": 0, "address": CONTRACT, "key": word(0), "value": word(1), "type": "account_state" }]
            }]
        }),
    );

    let diff = fx.fetcher().fetch_source_diff(&word(0x77)).await.unwrap().unwrap();
    assert_eq!(diff.transactions[0].kind, TransactionKind::Eth);
    assert_eq!(fx.native.calls()[0].params, vec![json!(word(0x77))]);
    assert_eq!(fx.web3.calls().len(), 0);
}

#[tokio::test]
async fn test_null_source_diff_is_not_materialized() {
    let fx = Fixture::new();
    fx.native.respond(STATE_CHANGES_METHOD, json!(null));
    assert!(fx.fetcher().fetch_source_diff(&word(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_block_hash_is_invalid_argument() {
    let fx = Fixture::new();
    let err = fx.fetcher().fetch_source_diff("0x1234").await.unwrap_err();
    assert!(matches!(err, VerifyError::InvalidArgument(_)));
    assert!(fx.native.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_kind_is_malformed_response() {
    let fx = Fixture::new();
    fx.native.respond(
        STATE_CHANGES_METHOD,
        json!({ "smt_stat": { "update_kvs": 0, "update_milliseconds": 0 },
                "transactions": [{ "tx_hash": word(1), "type": "bridge", "events": [] }] }),
    );
    let err = fx.fetcher().fetch_source_diff(&word(1)).await.unwrap_err();
    assert!(matches!(err, VerifyError::MalformedResponse { ref method, .. } if method == STATE_CHANGES_METHOD));
}

#[tokio::test]
async fn test_missing_extension_is_unsupported_not_null() {
    let fx = Fixture::new();
    let call = TransactionRequest::call(CONTRACT.parse::<Address>().unwrap(), vec![0x12]);

    let err = fx.fetcher().fetch_target_diff(&call, 9).await.unwrap_err();
    assert!(err.is_unsupported());

    let err = fx.fetcher().fetch_source_diff(&word(1)).await.unwrap_err();
    assert!(err.is_unsupported());
}

#[tokio::test]
async fn test_remote_not_found_errors_stay_rpc_errors() {
    let fx = Fixture::new();
    fx.native
        .fail_remote(STATE_CHANGES_METHOD, -32000, "block does not exist");
    fx.web3
        .fail_remote(HASH_CORRELATION_METHOD, -32000, "transaction does not exist");

    let err = fx.fetcher().fetch_source_diff(&word(1)).await.unwrap_err();
    match err {
        VerifyError::Rpc(e) => {
            assert_eq!(e.code, Some(-32000));
            assert_eq!(e.message, "block does not exist");
        }
        other => panic!("expected Rpc, got {:?}", other),
    }

    let err = fx
        .fetcher()
        .resolve_native_tx_hash(&H256::from_word(&[7]).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Rpc(ref e) if e.message == "transaction does not exist"));
}

#[tokio::test]
async fn test_unsupported_keeps_method_not_found_reply() {
    let fx = Fixture::new();
    fx.target.fail_remote(
        DEBUG_CALL_METHOD,
        -32000,
        "the method debug_call does not exist/is not available",
    );
    let call = TransactionRequest::call(CONTRACT.parse::<Address>().unwrap(), vec![]);

    let err = fx.fetcher().fetch_target_diff(&call, 1).await.unwrap_err();
    match err {
        VerifyError::UnsupportedOperation { method, cause, .. } => {
            assert_eq!(method, DEBUG_CALL_METHOD);
            assert_eq!(cause.code, Some(-32000));
            assert!(cause.message.contains("does not exist"));
        }
        other => panic!("expected UnsupportedOperation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_target_diff_null_vs_empty() {
    let fx = Fixture::new();
    let call = TransactionRequest::call(CONTRACT.parse::<Address>().unwrap(), vec![0x12]);

    fx.target.respond(DEBUG_CALL_METHOD, json!(null));
    assert!(fx.fetcher().fetch_target_diff(&call, 9).await.unwrap().is_none());

    fx.target.respond(DEBUG_CALL_METHOD, json!([]));
    let diff = fx.fetcher().fetch_target_diff(&call, 9).await.unwrap().unwrap();
    assert!(diff.is_empty());

    let params = &fx.target.calls()[0].params;
    assert_eq!(params[0], json!({ "to": CONTRACT, "data": "0x12" }));
    assert_eq!(params[1], json!("0x9"));
}

#[tokio::test]
async fn test_target_diff_transport_failure_propagates() {
    let fx = Fixture::new();
    fx.target.fail(
        DEBUG_CALL_METHOD,
        migration_verifier_types::RpcError::transport(DEBUG_CALL_METHOD, "connection reset"),
    );
    let call = TransactionRequest::call(CONTRACT.parse::<Address>().unwrap(), vec![]);
    let err = fx.fetcher().fetch_target_diff(&call, 1).await.unwrap_err();
    assert!(matches!(err, VerifyError::Rpc(ref e) if e.code.is_none()));
}

#[tokio::test]
async fn test_resolve_native_hash() {
    let fx = Fixture::new();
    let eth_hash = H256::from_word(&[1]).unwrap();
    fx.web3.respond_with_params(
        HASH_CORRELATION_METHOD,
        vec![json!(eth_hash.to_hex())],
        json!(word(0xbb)),
    );
    let native = fx.fetcher().resolve_native_tx_hash(&eth_hash).await.unwrap();
    assert_eq!(native, Some(H256::from_word(&[0xbb]).unwrap()));

    fx.web3.respond(HASH_CORRELATION_METHOD, json!(null));
    let other = H256::from_word(&[2]).unwrap();
    assert_eq!(fx.fetcher().resolve_native_tx_hash(&other).await.unwrap(), None);
}

#[tokio::test]
async fn test_debug_replay_returns_raw_trace_from_web3_endpoint() {
    let fx = Fixture::new();
    fx.web3.respond(
        DEBUG_REPLAY_METHOD,
        json!({ "exit_code": 0, "logs": [{ "service_flag": 1 }] }),
    );

    let trace = fx.fetcher().debug_replay(&H256::from_word(&[0x42]).unwrap()).await.unwrap();
    assert_eq!(trace["exit_code"], json!(0));
    assert_eq!(fx.web3.calls()[0].params, vec![json!(word(0x42))]);
    assert_eq!(fx.native.calls().len(), 0);
}

#[tokio::test]
async fn test_debug_replay_absent_is_unsupported() {
    let fx = Fixture::new();
    let err = fx
        .fetcher()
        .debug_replay(&H256::from_word(&[0x42]).unwrap())
        .await
        .unwrap_err();
    assert!(err.is_unsupported());
}
