//! Tests for `ServerConfig::from_env` validation.

use assert_matches::assert_matches;
use lumen_api::config::ServerConfig;
use lumen_core::env::ConfigError;

// ---------------------------------------------------------------------------
// Test: a zero wait poll interval is rejected at startup
// ---------------------------------------------------------------------------

#[test]
fn zero_wait_poll_interval_is_rejected() {
    std::env::set_var("WAIT_POLL_INTERVAL_MS", "0");
    let result = ServerConfig::from_env();
    std::env::remove_var("WAIT_POLL_INTERVAL_MS");

    assert_matches!(
        result,
        Err(ConfigError::Invalid { key: "WAIT_POLL_INTERVAL_MS", .. })
    );
}
