//! Integration tests for the `validate` command.
use npa_howtopay::cli::handle_validate_command;
use npa_howtopay::settings::Settings;
use std::path::PathBuf;

/// Get the path to the bundled presets.
fn get_presets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("presets")
}

#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("NPA_HOWTOPAY_LOG_LEVEL", "off") };
    handle_validate_command(
        &get_presets_dir().join("large_program.toml"),
        Some(Settings::default()),
    )
    .unwrap();
}
