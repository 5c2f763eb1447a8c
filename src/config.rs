//! Verifier configuration.
//!
//! Loaded from an optional JSON file, then overridden from the environment.
//! The resulting [`VerifierConfig`] is passed explicitly to every component;
//! nothing reads endpoints from global state.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use migration_state_fetcher::{BackoffStrategy, IngestionCriterion, PollConfig};
use migration_transport::network::{
    DEFAULT_SOURCE_NATIVE_RPC, DEFAULT_SOURCE_RPC, DEFAULT_TARGET_RPC, SOURCE_NATIVE_RPC_ENV,
    SOURCE_RPC_ENV, TARGET_RPC_ENV,
};
use migration_verifier_types::env_utils::{env_string, override_from_env};
use migration_verifier_types::{ChainEndpoint, ChainRole, RetryConfig};

pub const POLL_INTERVAL_ENV: &str = "MIGRATION_POLL_INTERVAL_MS";
pub const CHECKPOINT_TIMEOUT_ENV: &str = "MIGRATION_CHECKPOINT_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    pub margin_blocks: u64,
    pub strategy: BackoffStrategy,
    /// Cap for exponential polling.
    pub max_interval_ms: u64,
    pub mode: IngestionCriterion,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            timeout_ms: 300_000,
            margin_blocks: 1,
            strategy: BackoffStrategy::Fixed,
            max_interval_ms: 10_000,
            mode: IngestionCriterion::TipMargin,
        }
    }
}

impl CheckpointConfig {
    pub fn poll_config(&self) -> PollConfig {
        let interval = Duration::from_millis(self.poll_interval_ms);
        let timeout = Duration::from_millis(self.timeout_ms);
        match self.strategy {
            BackoffStrategy::Fixed => PollConfig::fixed(interval, timeout),
            BackoffStrategy::Exponential => PollConfig::exponential(
                interval,
                Duration::from_millis(self.max_interval_ms),
                timeout,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub source: ChainEndpoint,
    /// Endpoint serving the source's state-change extension; `source` when absent.
    pub source_native: Option<ChainEndpoint>,
    pub target: ChainEndpoint,
    pub checkpoint: CheckpointConfig,
    /// Bounded retry while the source diff or hash correlation is still `null`.
    pub source_diff_retry: RetryConfig,
    pub confirmation_timeout_ms: u64,
    /// Overall budget of one scenario run.
    pub run_timeout_ms: u64,
    pub http_timeout_ms: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            source: ChainEndpoint::new(ChainRole::Source, "source", DEFAULT_SOURCE_RPC),
            source_native: Some(ChainEndpoint::new(
                ChainRole::Source,
                "source-native",
                DEFAULT_SOURCE_NATIVE_RPC,
            )),
            target: ChainEndpoint::new(ChainRole::Target, "target", DEFAULT_TARGET_RPC),
            checkpoint: CheckpointConfig::default(),
            source_diff_retry: RetryConfig::default(),
            confirmation_timeout_ms: 60_000,
            run_timeout_ms: 600_000,
            http_timeout_ms: 30_000,
        }
    }
}

impl VerifierConfig {
    /// File (if any), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_string(SOURCE_RPC_ENV) {
            self.source.url = url;
        }
        if let Some(url) = env_string(SOURCE_NATIVE_RPC_ENV) {
            let label = "source-native";
            match &mut self.source_native {
                Some(ep) => ep.url = url,
                None => {
                    self.source_native = Some(ChainEndpoint::new(ChainRole::Source, label, url))
                }
            }
        }
        if let Some(url) = env_string(TARGET_RPC_ENV) {
            self.target.url = url;
        }
        override_from_env(&mut self.checkpoint.poll_interval_ms, POLL_INTERVAL_ENV);
        override_from_env(&mut self.checkpoint.timeout_ms, CHECKPOINT_TIMEOUT_ENV);
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.role != ChainRole::Source {
            bail!("`source` endpoint must have role source");
        }
        if self.target.role != ChainRole::Target {
            bail!("`target` endpoint must have role target");
        }
        if self.checkpoint.poll_interval_ms == 0 {
            bail!("checkpoint.poll_interval_ms must be positive");
        }
        for (field, value) in [
            ("checkpoint.timeout_ms", self.checkpoint.timeout_ms),
            ("confirmation_timeout_ms", self.confirmation_timeout_ms),
            ("run_timeout_ms", self.run_timeout_ms),
            ("http_timeout_ms", self.http_timeout_ms),
        ] {
            if value == 0 {
                bail!("{} must be positive", field);
            }
        }
        Ok(())
    }

    /// The endpoint serving custom source methods.
    pub fn source_native_endpoint(&self) -> &ChainEndpoint {
        self.source_native.as_ref().unwrap_or(&self.source)
    }

    pub fn confirmation_poll(&self) -> PollConfig {
        PollConfig::fixed(
            Duration::from_millis(self.checkpoint.poll_interval_ms),
            Duration::from_millis(self.confirmation_timeout_ms),
        )
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
