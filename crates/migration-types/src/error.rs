//! Error taxonomy shared by every verifier component.

use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::primitives::ParseHexError;

/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND: i64 = -32601;

/// A remote call failed, either in transport or with an error payload.
///
/// The remote payload is kept verbatim so failures can be diagnosed from the
/// report alone.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub method: String,
    /// `None` for transport failures (connection refused, HTTP status, bad body).
    pub code: Option<i64>,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn remote(method: &str, code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            method: method.to_string(),
            code: Some(code),
            message: message.into(),
            data,
        }
    }

    pub fn transport(method: &str, message: impl Into<String>) -> Self {
        Self {
            method: method.to_string(),
            code: None,
            message: message.into(),
            data: None,
        }
    }

    /// Whether the endpoint does not implement `method` at all.
    ///
    /// Code -32601, or geth's `the method <name> does not exist/is not
    /// available` naming this very method. Other "does not exist" errors
    /// (unknown block, unknown transaction) are ordinary remote failures.
    pub fn is_method_not_found(&self) -> bool {
        match self.code {
            Some(METHOD_NOT_FOUND) => true,
            Some(_) => {
                let msg = self.message.to_ascii_lowercase();
                let prefix = format!("the method {} ", self.method.to_ascii_lowercase());
                msg.starts_with(&prefix)
                    && (msg.contains("does not exist") || msg.contains("is not available"))
            }
            None => false,
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} failed with code {}: {}", self.method, code, self.message)?,
            None => write!(f, "{} transport error: {}", self.method, self.message)?,
        }
        if let Some(data) = &self.data {
            write!(f, " (data: {})", data)?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

/// Errors surfaced by the verifier.
#[derive(Debug, Clone)]
pub enum VerifyError {
    /// Remote call failed; fatal to the current step.
    Rpc(RpcError),

    /// The target chain did not reach the checkpoint within budget.
    Timeout {
        /// What was being waited for.
        waiting_for: String,
        waited: Duration,
        /// Last target tip seen, if any poll succeeded.
        last_observed_tip: Option<u64>,
    },

    /// A malformed identifier was supplied by the caller.
    InvalidArgument(String),

    /// An endpoint lacks a custom method the verifier needs.
    UnsupportedOperation {
        method: String,
        endpoint: String,
        /// The remote "method not found" reply.
        cause: RpcError,
    },

    /// A response did not decode into the expected shape.
    MalformedResponse { method: String, detail: String },

    /// One or more equivalence assertions failed.
    ConsistencyMismatch { failed: usize, total: usize },

    /// The transaction under test reverted or never confirmed.
    Precondition(String),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::Rpc(e) => write!(f, "RPC error: {}", e),
            VerifyError::Timeout {
                waiting_for,
                waited,
                last_observed_tip,
            } => {
                write!(
                    f,
                    "timed out after {}ms waiting for {}",
                    waited.as_millis(),
                    waiting_for
                )?;
                match last_observed_tip {
                    Some(tip) => write!(f, " (last observed tip {})", tip),
                    None => write!(f, " (no tip observed)"),
                }
            }
            VerifyError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            VerifyError::UnsupportedOperation {
                method,
                endpoint,
                cause,
            } => {
                write!(f, "{} does not support {} ({})", endpoint, method, cause)
            }
            VerifyError::MalformedResponse { method, detail } => {
                write!(f, "malformed {} response: {}", method, detail)
            }
            VerifyError::ConsistencyMismatch { failed, total } => {
                write!(f, "{} of {} equivalence assertions failed", failed, total)
            }
            VerifyError::Precondition(msg) => write!(f, "precondition failed: {}", msg),
        }
    }
}

impl std::error::Error for VerifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VerifyError::Rpc(e) => Some(e),
            VerifyError::UnsupportedOperation { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<RpcError> for VerifyError {
    fn from(e: RpcError) -> Self {
        VerifyError::Rpc(e)
    }
}

impl From<ParseHexError> for VerifyError {
    fn from(e: ParseHexError) -> Self {
        VerifyError::InvalidArgument(e.to_string())
    }
}

impl VerifyError {
    pub fn malformed(method: &str, detail: impl fmt::Display) -> Self {
        VerifyError::MalformedResponse {
            method: method.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, VerifyError::Timeout { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, VerifyError::UnsupportedOperation { .. })
    }

    /// Short machine-readable label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::Rpc(_) => "rpc",
            VerifyError::Timeout { .. } => "timeout",
            VerifyError::InvalidArgument(_) => "invalid_argument",
            VerifyError::UnsupportedOperation { .. } => "unsupported_operation",
            VerifyError::MalformedResponse { .. } => "malformed_response",
            VerifyError::ConsistencyMismatch { .. } => "consistency_mismatch",
            VerifyError::Precondition(_) => "precondition",
        }
    }
}

pub type VerifyResult<T> = Result<T, VerifyError>;
