//! Environment variable overrides for verifier configuration.
//!
//! Every helper treats a variable that is unset, blank, or unparseable as
//! absent so a stray empty export never clobbers a configured value.
//!
//! ```
//! use migration_verifier_types::env_utils::{env_duration_ms, env_var_or};
//!
//! let margin: u64 = env_var_or("MIGRATION_MARGIN_BLOCKS", 1);
//! let poll = env_duration_ms("MIGRATION_POLL_INTERVAL_MS");
//! # let _ = (margin, poll);
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Parse an environment variable into a type that implements `FromStr`.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

/// Parse an environment variable, falling back to `default`.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Non-blank string value of an environment variable.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A millisecond count read from the environment.
pub fn env_duration_ms(key: &str) -> Option<Duration> {
    env_var::<u64>(key).map(Duration::from_millis)
}

/// Overwrite `slot` when `key` is set.
pub fn override_from_env<T: FromStr>(slot: &mut T, key: &str) {
    if let Some(v) = env_var(key) {
        *slot = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_parsing() {
        std::env::set_var("MIGRATION_TEST_U64", "42");
        assert_eq!(env_var::<u64>("MIGRATION_TEST_U64"), Some(42));
        assert_eq!(env_var::<u64>("MIGRATION_TEST_MISSING_1"), None);
        assert_eq!(env_var_or("MIGRATION_TEST_MISSING_2", 7u64), 7);
        std::env::remove_var("MIGRATION_TEST_U64");
    }

    #[test]
    fn test_blank_is_absent() {
        std::env::set_var("MIGRATION_TEST_BLANK", "   ");
        assert_eq!(env_string("MIGRATION_TEST_BLANK"), None);
        let mut url = "http://localhost:8000".to_string();
        override_from_env(&mut url, "MIGRATION_TEST_BLANK");
        assert_eq!(url, "http://localhost:8000");
        std::env::remove_var("MIGRATION_TEST_BLANK");
    }

    #[test]
    fn test_duration_and_override() {
        std::env::set_var("MIGRATION_TEST_MS", "250");
        assert_eq!(
            env_duration_ms("MIGRATION_TEST_MS"),
            Some(Duration::from_millis(250))
        );
        let mut n = 1u64;
        override_from_env(&mut n, "MIGRATION_TEST_MS");
        assert_eq!(n, 250);
        std::env::remove_var("MIGRATION_TEST_MS");
    }
}
