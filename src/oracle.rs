//! Equivalence oracle: identical read-only queries against both chains.
//!
//! Every comparison runs once. A mismatch is reported as a failed assertion
//! and never retried, since a converged migration must already agree.

use std::sync::Arc;

use tracing::{debug, warn};

use migration_transport::{EthApi, RpcClient};
use migration_verifier_types::{
    Address, AssertionCategory, BlockTag, Bytes, EquivalenceAssertion, TransactionRequest,
    VerifyResult, H256,
};

pub struct EquivalenceOracle {
    source: Arc<dyn RpcClient>,
    target: Arc<dyn RpcClient>,
}

fn log_outcome(assertion: &EquivalenceAssertion) {
    if assertion.passed {
        debug!(category = %assertion.category, description = %assertion.description, "assertion passed");
    } else {
        warn!(
            category = %assertion.category,
            description = %assertion.description,
            expected = %assertion.expected,
            actual = %assertion.actual,
            "assertion failed"
        );
    }
}

impl EquivalenceOracle {
    pub fn new(source: Arc<dyn RpcClient>, target: Arc<dyn RpcClient>) -> Self {
        Self { source, target }
    }

    /// `eth_call` with the same request on both chains at latest state.
    pub async fn assert_equal_call(
        &self,
        description: &str,
        request: &TransactionRequest,
    ) -> VerifyResult<EquivalenceAssertion> {
        let (on_source, on_target) = tokio::try_join!(
            self.source.eth_call(request, BlockTag::Latest),
            self.target.eth_call(request, BlockTag::Latest),
        )?;
        let assertion =
            EquivalenceAssertion::compare(AssertionCategory::Call, description, on_source, on_target);
        log_outcome(&assertion);
        Ok(assertion)
    }

    /// Native balance of `address` on both chains at latest state.
    pub async fn assert_equal_balance(&self, address: &Address) -> VerifyResult<EquivalenceAssertion> {
        let (on_source, on_target) = tokio::try_join!(
            self.source.balance(address, BlockTag::Latest),
            self.target.balance(address, BlockTag::Latest),
        )?;
        let assertion = EquivalenceAssertion::compare(
            AssertionCategory::Balance,
            format!("balance of {}", address),
            on_source,
            on_target,
        );
        log_outcome(&assertion);
        Ok(assertion)
    }

    /// The target knows the source transaction `tx_hash`.
    pub async fn assert_receipt_present(&self, tx_hash: &H256) -> VerifyResult<EquivalenceAssertion> {
        let receipt = self.target.transaction_receipt(tx_hash).await?;
        let actual = receipt
            .as_ref()
            .map(|r| Bytes::from(r.transaction_hash))
            .unwrap_or_default();
        let assertion = EquivalenceAssertion::verdict(
            AssertionCategory::Receipt,
            format!("target receipt for {}", tx_hash),
            Bytes::from(*tx_hash),
            actual,
            receipt.is_some(),
        );
        log_outcome(&assertion);
        Ok(assertion)
    }

    /// The target holds non-empty code at `address`; expected is the source's code.
    pub async fn assert_code_present(&self, address: &Address) -> VerifyResult<EquivalenceAssertion> {
        let (on_source, on_target) = tokio::try_join!(
            self.source.code(address, BlockTag::Latest),
            self.target.code(address, BlockTag::Latest),
        )?;
        let passed = !on_target.is_empty();
        let assertion = EquivalenceAssertion::verdict(
            AssertionCategory::Code,
            format!("target code at {}", address),
            on_source,
            on_target,
            passed,
        );
        log_outcome(&assertion);
        Ok(assertion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_transport::MockRpcClient;
    use serde_json::json;

    fn oracle() -> (MockRpcClient, MockRpcClient, EquivalenceOracle) {
        let source = MockRpcClient::source();
        let target = MockRpcClient::target();
        let oracle = EquivalenceOracle::new(Arc::new(source.clone()), Arc::new(target.clone()));
        (source, target, oracle)
    }

    fn account() -> Address {
        Address([0x11; 20])
    }

    #[tokio::test]
    async fn test_balance_equivalence() {
        let (source, target, oracle) = oracle();
        source.respond("eth_getBalance", json!("0xde0b6b3a7640000"));
        target.respond("eth_getBalance", json!("0x0de0b6b3a7640000"));
        let a = oracle.assert_equal_balance(&account()).await.unwrap();
        assert!(a.passed, "{}", a);

        target.respond("eth_getBalance", json!("0x1"));
        let b = oracle.assert_equal_balance(&account()).await.unwrap();
        assert!(!b.passed);
    }

    #[tokio::test]
    async fn test_call_mismatch_is_reported_not_retried() {
        let (source, target, oracle) = oracle();
        source.respond("eth_call", json!("0x01"));
        target.respond("eth_call", json!("0x02"));
        let req = TransactionRequest::call(account(), vec![1, 2, 3, 4]);
        let a = oracle.assert_equal_call("getBool()", &req).await.unwrap();
        assert!(!a.passed);
        assert_eq!(target.call_count("eth_call"), 1);
    }

    #[tokio::test]
    async fn test_call_error_propagates() {
        let (source, target, oracle) = oracle();
        source.respond("eth_call", json!("0x01"));
        target.fail_remote("eth_call", 3, "execution reverted");
        let req = TransactionRequest::call(account(), vec![]);
        assert!(oracle.assert_equal_call("x", &req).await.is_err());
    }

    #[tokio::test]
    async fn test_receipt_and_code_presence() {
        let (source, target, oracle) = oracle();
        let hash = H256::from_word(&[7]).unwrap();
        target.respond("eth_getTransactionReceipt", json!(null));
        assert!(!oracle.assert_receipt_present(&hash).await.unwrap().passed);

        source.respond("eth_getCode", json!("0x6080"));
        target.respond("eth_getCode", json!("0x"));
        assert!(!oracle.assert_code_present(&account()).await.unwrap().passed);
        target.respond("eth_getCode", json!("0x6080"));
        assert!(oracle.assert_code_present(&account()).await.unwrap().passed);
    }
}
