//! RPC client adapter.
//!
//! [`RpcClient`] is the seam every verifier component talks through. The HTTP
//! implementation holds nothing but the endpoint and a connection agent, and it
//! never retries: a retry policy belongs to whoever knows whether a failure is
//! transient (the checkpoint monitor, the scenario driver).

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use migration_verifier_types::{ChainEndpoint, RpcError};

use crate::jsonrpc::{parse_response, JsonRpcRequest};

/// Issues JSON-RPC calls against one chain endpoint.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// The endpoint this client talks to.
    fn endpoint(&self) -> &ChainEndpoint;

    /// Call `method` with positional `params`, returning the raw `result`.
    ///
    /// A `null` result is returned as `Value::Null`, never as an error.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError>;
}

/// JSON-RPC over HTTP POST.
pub struct HttpRpcClient {
    endpoint: ChainEndpoint,
    agent: ureq::Agent,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(endpoint: ChainEndpoint) -> Self {
        Self::with_timeouts(
            endpoint,
            Self::DEFAULT_TIMEOUT,
            Self::DEFAULT_CONNECT_TIMEOUT,
        )
    }

    pub fn with_timeouts(
        endpoint: ChainEndpoint,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            endpoint,
            agent: ureq::AgentBuilder::new()
                .timeout(timeout)
                .timeout_connect(connect_timeout)
                .build(),
            next_id: AtomicU64::new(1),
        }
    }

    fn post(agent: &ureq::Agent, url: &str, method: &str, body: &Value) -> Result<Value, RpcError> {
        let response = match agent
            .post(url)
            .set("Content-Type", "application/json")
            .send_json(body)
        {
            Ok(resp) => resp,
            // Some nodes answer JSON-RPC errors with a 4xx/5xx status; keep the
            // payload when there is one.
            Err(ureq::Error::Status(status, resp)) => {
                return match resp.into_json::<Value>() {
                    Ok(body) if body.get("error").is_some() => parse_response(method, body),
                    _ => Err(RpcError::transport(method, format!("HTTP status {}", status))),
                };
            }
            Err(e) => return Err(RpcError::transport(method, e.to_string())),
        };

        response
            .into_json::<Value>()
            .map_err(|e| RpcError::transport(method, format!("invalid JSON body: {}", e)))
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    fn endpoint(&self) -> &ChainEndpoint {
        &self.endpoint
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_value(JsonRpcRequest::new(id, method, params))
            .map_err(|e| RpcError::transport(method, e.to_string()))?;
        debug!(endpoint = %self.endpoint, method, id, "rpc request");

        let agent = self.agent.clone();
        let url = self.endpoint.url.clone();
        let owned_method = method.to_string();
        let raw = tokio::task::spawn_blocking(move || Self::post(&agent, &url, &owned_method, &body))
            .await
            .map_err(|e| RpcError::transport(method, format!("request task failed: {}", e)))??;

        parse_response(method, raw)
    }
}
