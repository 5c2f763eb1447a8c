//! Default endpoints of a local devnet pair and their environment overrides.

/// Web3-compatible RPC of the source chain.
pub const DEFAULT_SOURCE_RPC: &str = "http://localhost:8024";
/// Native RPC of the source chain serving the state-change extension.
pub const DEFAULT_SOURCE_NATIVE_RPC: &str = "http://localhost:8119";
/// RPC of the target chain.
pub const DEFAULT_TARGET_RPC: &str = "http://127.0.0.1:8000";

pub const SOURCE_RPC_ENV: &str = "MIGRATION_SOURCE_RPC";
pub const SOURCE_NATIVE_RPC_ENV: &str = "MIGRATION_SOURCE_NATIVE_RPC";
pub const TARGET_RPC_ENV: &str = "MIGRATION_TARGET_RPC";
