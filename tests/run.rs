//! Integration tests for the `run` command.
use fleetbca::cli::demo::extract_demo;
use fleetbca::cli::{RunOpts, handle_run_command};
use fleetbca::settings::Settings;
use std::fs;
use tempfile::tempdir;

/// Settings that keep the test output quiet and enable the detail file
fn quiet_settings() -> Settings {
    Settings {
        log_level: "off".to_string(),
        overwrite: false,
        write_detail: true,
    }
}

/// An integration test for the `run` command on the bundled demo model.
#[test]
fn test_handle_run_command() {
    let model_dir = tempdir().unwrap();
    extract_demo("simple", model_dir.path()).unwrap();

    let output_dir = tempdir().unwrap();
    // Save results to a non-existent directory to check that directory creation works
    let output_path = output_dir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_path.clone()),
        overwrite: false,
        detail: false,
    };
    handle_run_command(model_dir.path(), &opts, Some(quiet_settings())).unwrap();

    for file_name in ["annual_summary.csv", "estimated_ages.csv", "cost_records.csv"] {
        assert!(
            output_path.join(file_name).is_file(),
            "{file_name} was not written"
        );
    }

    // The summary holds both absolute and delta rows for the action option
    let summary = fs::read_to_string(output_path.join("annual_summary.csv")).unwrap();
    assert!(summary.lines().any(|line| line.starts_with("absolute,proposal")));
    assert!(
        summary
            .lines()
            .any(|line| line.starts_with("delta-vs-no-action,proposal"))
    );
    // No delta rows exist for the no-action option itself
    assert!(
        !summary
            .lines()
            .any(|line| line.starts_with("delta-vs-no-action,no-action"))
    );

    // A second run will fail because the logging is already initialised
    let second_output = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(second_output.path().join("results")),
        overwrite: false,
        detail: false,
    };
    assert_eq!(
        handle_run_command(model_dir.path(), &opts, Some(quiet_settings()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
