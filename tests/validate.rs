//! Integration tests for the `validate` command.
use fleetbca::cli::demo::extract_demo;
use fleetbca::cli::handle_validate_command;
use fleetbca::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `validate` command on the bundled demo model.
#[test]
fn test_handle_validate_command() {
    let model_dir = tempdir().unwrap();
    extract_demo("simple", model_dir.path()).unwrap();

    let settings = Settings {
        log_level: "off".to_string(),
        ..Settings::default()
    };
    handle_validate_command(model_dir.path(), Some(settings)).unwrap();
}
