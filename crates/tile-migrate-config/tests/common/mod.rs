// crates/tile-migrate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for tile-migrate-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use tile_migrate_config::ConfigError;
use tile_migrate_config::MigrateConfig;

/// Smallest config accepted by validation.
pub const MINIMAL_TOML: &str = r#"
[source]
type = "sqlite"
path = "source.sqlite"

[destination]
type = "sqlite"
path = "destination.sqlite"
"#;

/// Parses a TOML string into a `MigrateConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<MigrateConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<MigrateConfig, toml::de::Error> {
    config_from_toml(MINIMAL_TOML)
}

/// Checks that `result` failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
