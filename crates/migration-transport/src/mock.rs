//! Scripted in-memory [`RpcClient`] for tests.
//!
//! Responses are registered per method. A sequence is consumed one response
//! per call and its last entry repeats, which is how polling tests model a tip
//! that advances and then stays put. Responses registered for exact params win
//! over per-method ones. Unregistered methods answer "method not found".
//! A method marked with [`MockRpcClient::hang`] never answers.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use migration_verifier_types::{ChainEndpoint, RpcError, METHOD_NOT_FOUND};

use crate::client::RpcClient;

type Scripted = Result<Value, RpcError>;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
}

#[derive(Default)]
struct MockState {
    by_method: HashMap<String, VecDeque<Scripted>>,
    by_params: HashMap<(String, String), Scripted>,
    hanging: HashSet<String>,
    calls: Vec<RecordedCall>,
}

impl MockState {
    fn next_response(&mut self, method: &str, key: &(String, String)) -> Scripted {
        if let Some(scripted) = self.by_params.get(key) {
            return scripted.clone();
        }

        match self.by_method.get_mut(method) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| {
                Err(RpcError::transport(method, "mock response queue exhausted"))
            }),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| {
                Err(RpcError::transport(method, "mock response queue empty"))
            }),
            None => Err(RpcError::remote(
                method,
                METHOD_NOT_FOUND,
                "Method not found",
                None,
            )),
        }
    }
}

#[derive(Clone)]
pub struct MockRpcClient {
    endpoint: ChainEndpoint,
    state: Arc<Mutex<MockState>>,
}

impl MockRpcClient {
    pub fn new(endpoint: ChainEndpoint) -> Self {
        Self {
            endpoint,
            state: Arc::default(),
        }
    }

    pub fn source() -> Self {
        Self::new(ChainEndpoint::source("mock://source"))
    }

    pub fn target() -> Self {
        Self::new(ChainEndpoint::target("mock://target"))
    }

    /// Answer every call to `method` with `result`.
    pub fn respond(&self, method: &str, result: Value) -> &Self {
        self.respond_sequence(method, vec![result])
    }

    /// Answer successive calls with `results`; the last one repeats.
    pub fn respond_sequence(&self, method: &str, results: Vec<Value>) -> &Self {
        self.state
            .lock()
            .by_method
            .insert(method.to_string(), results.into_iter().map(Ok).collect());
        self
    }

    /// Answer calls to `method` whose params equal `params` exactly.
    pub fn respond_with_params(&self, method: &str, params: Vec<Value>, result: Value) -> &Self {
        self.state
            .lock()
            .by_params
            .insert((method.to_string(), params_key(&params)), Ok(result));
        self
    }

    /// Fail every call to `method` with `error`.
    pub fn fail(&self, method: &str, error: RpcError) -> &Self {
        self.state
            .lock()
            .by_method
            .insert(method.to_string(), VecDeque::from([Err(error)]));
        self
    }

    /// Fail every call to `method` with a remote error payload.
    pub fn fail_remote(&self, method: &str, code: i64, message: &str) -> &Self {
        self.fail(method, RpcError::remote(method, code, message, None))
    }

    /// Calls to `method` are recorded but never complete.
    pub fn hang(&self, method: &str) -> &Self {
        self.state.lock().hanging.insert(method.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .count()
    }
}

fn params_key(params: &[Value]) -> String {
    Value::Array(params.to_vec()).to_string()
}

#[async_trait]
impl RpcClient for MockRpcClient {
    fn endpoint(&self) -> &ChainEndpoint {
        &self.endpoint
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let scripted = {
            let mut state = self.state.lock();
            let key = (method.to_string(), params_key(&params));
            state.calls.push(RecordedCall {
                method: method.to_string(),
                params,
            });
            if state.hanging.contains(method) {
                None
            } else {
                Some(state.next_response(method, &key))
            }
        };

        match scripted {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}
