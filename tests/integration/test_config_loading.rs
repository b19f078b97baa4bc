use nbproc::core::config::{ConfigLoader, ConfigValidator, ExtractorKind};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const OVERRIDES: [&str; 6] = [
    "NBPROC_NOTEBOOK_DIR",
    "NBPROC_SCRIPT_DIR",
    "NBPROC_EXTRACTOR_PROGRAM",
    "NBPROC_EXTRACTOR_TIMEOUT",
    "NBPROC_LOG_TABLE",
    "NBPROC_ENTRY_POINT",
];

fn clear_env() {
    for key in OVERRIDES {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn workspace_without_config_uses_defaults() {
    clear_env();
    let workspace = TempDir::new().unwrap();

    let config = ConfigLoader::load_from_workspace(workspace.path()).unwrap();
    assert_eq!(config.paths.notebook_dir, PathBuf::from("notebooks"));
    assert_eq!(config.extractor.kind, ExtractorKind::Command);
    assert!(ConfigValidator::validate(&config).is_ok());
}

#[test]
#[serial]
fn workspace_config_file_is_read() {
    clear_env();
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("nbproc.toml"),
        r#"
[paths]
notebook_dir = "src/notebooks"

[imports]
blocklist = ["pyspark", "mlflow"]

[extractor]
kind = "builtin"
timeout = "45s"

[procedure]
entry_point = "handler"

[logging]
default_level = "debug"
console_output = "stdout"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_workspace(workspace.path()).unwrap();
    assert_eq!(config.paths.notebook_dir, PathBuf::from("src/notebooks"));
    assert_eq!(config.paths.script_dir, PathBuf::from("scripts"));
    assert_eq!(config.imports.blocklist, vec!["pyspark", "mlflow"]);
    assert_eq!(config.extractor.kind, ExtractorKind::Builtin);
    assert_eq!(
        config.extractor.timeout_duration().unwrap(),
        Duration::from_secs(45)
    );
    assert_eq!(config.procedure.entry_point, "handler");
    assert_eq!(config.procedure.context_param, "session");
    assert_eq!(config.logging.default_level.as_deref(), Some("debug"));
}

#[test]
#[serial]
fn environment_beats_file() {
    clear_env();
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("nbproc.toml"),
        "[procedure]\nentry_point = \"from_file\"\nlog_table = \"FILE.TABLE\"\n",
    )
    .unwrap();
    env::set_var("NBPROC_ENTRY_POINT", "from_env");
    env::set_var("NBPROC_EXTRACTOR_TIMEOUT", "5m");

    let config = ConfigLoader::load_from_workspace(workspace.path()).unwrap();
    clear_env();

    assert_eq!(config.procedure.entry_point, "from_env");
    assert_eq!(config.procedure.log_table, "FILE.TABLE");
    assert_eq!(
        config.extractor.timeout_duration().unwrap(),
        Duration::from_secs(300)
    );
}

#[test]
#[serial]
fn invalid_values_fail_validation() {
    clear_env();
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("nbproc.toml"),
        "[filter]\nplatform_call_patterns = [\"print(\"]\n",
    )
    .unwrap();

    let config = ConfigLoader::load_from_workspace(workspace.path()).unwrap();
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert!(err.to_string().contains("print("));
}

#[test]
#[serial]
fn malformed_file_is_a_config_error() {
    clear_env();
    let workspace = TempDir::new().unwrap();
    fs::write(workspace.path().join("nbproc.toml"), "[procedure\nentry_point = 1").unwrap();

    let err = ConfigLoader::load_from_workspace(workspace.path()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}
