//! Config load validation tests for tile-migrate-config.
// crates/tile-migrate-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tile_migrate_config::MigrateConfig;

mod common;

use common::assert_invalid;

type TestResult = Result<(), String>;

#[test]
fn load_reads_valid_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(common::MINIMAL_TOML.as_bytes()).map_err(|err| err.to_string())?;
    let config = MigrateConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.pipeline.batch_size != 25 {
        return Err("defaults not applied on load".to_string());
    }
    Ok(())
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(MigrateConfig::load(Some(path)), "config path exceeds max length")?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(MigrateConfig::load(Some(path)), "config path component too long")?;
    Ok(())
}

#[test]
fn load_reports_missing_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_invalid(MigrateConfig::load(Some(&path)), "config io error")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(MigrateConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(MigrateConfig::load(Some(file.path())), "config file must be utf-8")?;
    Ok(())
}

#[test]
fn load_reports_parse_errors() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[source\ntype = ").map_err(|err| err.to_string())?;
    assert_invalid(MigrateConfig::load(Some(file.path())), "config parse error")?;
    Ok(())
}

#[test]
fn load_runs_validation() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let toml = format!("{}\n[pipeline]\nbatch_size = 0\n", common::MINIMAL_TOML);
    file.write_all(toml.as_bytes()).map_err(|err| err.to_string())?;
    assert_invalid(MigrateConfig::load(Some(file.path())), "pipeline.batch_size")?;
    Ok(())
}
