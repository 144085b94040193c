//! Loading configuration from files on disk.

use std::io::Write;

use switchyard_config::{ConfigError, ConfigLoader, LogFormat};
use switchyard_core::Mode;
use tempfile::Builder;

#[test]
fn loads_toml_file() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[engine]
mode = "test"

[server]
http_addr = "127.0.0.1:4000"
max_body_bytes = 1024

[telemetry.logging]
level = "debug"
format = "pretty"
"#
    )
    .unwrap();

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert_eq!(config.engine.mode, Mode::Test);
    assert_eq!(config.server.http_addr, "127.0.0.1:4000");
    assert_eq!(config.to_server_config().max_body_bytes(), 1024);
    assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
}

#[test]
fn loads_json_file() {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"timeout": {{"enabled": true, "duration_ms": 750, "message": "too slow"}}}}"#
    )
    .unwrap();

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    let guard = config.timeout_guard().unwrap();
    assert_eq!(guard.duration().as_millis(), 750);
    assert_eq!(config.timeout.message, "too slow");
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = ConfigLoader::new().with_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

#[test]
fn missing_optional_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigLoader::new()
        .with_development()
        .with_optional_file(dir.path().join("absent.toml"))
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(config.telemetry.logging.level, "debug");
}

#[test]
fn unknown_extension_is_rejected() {
    let file = Builder::new().suffix(".yaml").tempfile().unwrap();
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
}

#[test]
fn invalid_file_values_fail_validation() {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[server]\nhttp_addr = \"not-an-address\"").unwrap();

    let err = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap_err();
    assert!(err.to_string().contains("server.http_addr"));
}
