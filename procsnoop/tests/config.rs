use procsnoop::config::{resolve_config_path, AppConfig};
use procsnoop::probe::{DEFAULT_OBJECT_PATH, DEFAULT_PIN_PATH};
use std::fs;
use std::path::{Path, PathBuf};

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("procsnoop.yaml");
    fs::write(&path, content).expect("write config failed");
    path
}

#[test]
fn defaults_report_everything() {
    let config = AppConfig::default();
    assert_eq!(config.min_duration_ms, 0);
    assert_eq!(config.object_path, PathBuf::from(DEFAULT_OBJECT_PATH));
    assert_eq!(config.pin_path, PathBuf::from(DEFAULT_PIN_PATH));
    assert_eq!(config.default_log_level(), "info");
    assert_eq!(config.probe_options().min_duration_ns(), 0);
}

#[test]
fn partial_file_keeps_remaining_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
min_duration_ms: 15
log_level: "debug"
"#,
    );

    let config = AppConfig::load_from_file(&path).unwrap();
    assert_eq!(config.min_duration_ms, 15);
    assert_eq!(config.default_log_level(), "debug");
    assert_eq!(config.object_path, PathBuf::from(DEFAULT_OBJECT_PATH));

    let options = config.probe_options();
    assert_eq!(options.min_duration_ns(), 15_000_000);
    assert_eq!(options.pin_path, PathBuf::from(DEFAULT_PIN_PATH));
}

#[test]
fn full_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
min_duration_ms: 100
object_path: "/opt/procsnoop/probe.o"
pin_path: "/sys/fs/bpf/procsnoop"
log_level: "warn"
log_directory: "/var/log/procsnoop"
"#,
    );

    let config = AppConfig::load_from_file(&path).unwrap();
    assert_eq!(
        config,
        AppConfig {
            min_duration_ms: 100,
            object_path: PathBuf::from("/opt/procsnoop/probe.o"),
            pin_path: PathBuf::from("/sys/fs/bpf/procsnoop"),
            log_level: Some("warn".into()),
            log_directory: Some(PathBuf::from("/var/log/procsnoop")),
        }
    );
}

#[test]
fn unknown_or_negative_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let path = write_config(dir.path(), "min_duration: 5\n");
    assert!(AppConfig::load_from_file(&path).is_err());

    let path = write_config(dir.path(), "min_duration_ms: -5\n");
    assert!(AppConfig::load_from_file(&path).is_err());
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = AppConfig::load_from_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("absent.yaml"));
}

#[test]
fn explicit_path_wins() {
    let explicit = PathBuf::from("/tmp/explicit-procsnoop.yaml");
    assert_eq!(resolve_config_path(Some(explicit.as_path())), Some(explicit));
}
