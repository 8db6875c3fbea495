//! Integration tests for loading configuration from disk.
//!
//! Each test uses its own temp file and unique env var names so tests can run
//! in parallel.

use std::io::Write;

use gemrelay::config::{Config, ConfigError, KeySource, LogFormat};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"
[server]
listen = "0.0.0.0:8888"
path = "/relay"

[upstream]
base_url = "https://generativelanguage.googleapis.com"
api_key_env = "GEMRELAY_FILE_TEST_01"

[logging]
level = "debug"
format = "json"
"#,
    );

    let config = Config::from_file(file.path()).expect("config should load");
    assert_eq!(config.server.listen, "0.0.0.0:8888");
    assert_eq!(config.server.path, "/relay");
    assert_eq!(config.upstream.api_key_env, "GEMRELAY_FILE_TEST_01");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Config::from_file("/nonexistent/gemrelay/config.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/gemrelay/config.toml"));
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let file = write_config("[server\nlisten = ");
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_health_path_is_rejected() {
    let file = write_config(
        r#"
[server]
path = "/health"
"#,
    );
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn test_api_key_expanded_from_env() {
    let var_name = "GEMRELAY_FILE_TEST_02_KEY";
    std::env::set_var(var_name, "expanded-secret");

    let file = write_config(&format!(
        r#"
[upstream]
api_key = "${{{}}}"
"#,
        var_name
    ));

    let config = Config::from_file(file.path()).expect("config should load");
    assert_eq!(config.upstream.key_source(), KeySource::EnvExpanded);
    assert_eq!(
        config.upstream.resolve_api_key().unwrap().expose_secret(),
        "expanded-secret"
    );

    std::env::remove_var(var_name);
}

#[test]
fn test_missing_expansion_var_names_variable() {
    let var_name = "GEMRELAY_FILE_TEST_03_MISSING";
    std::env::remove_var(var_name);

    let file = write_config(&format!(
        r#"
[upstream]
api_key = "${{{}}}"
"#,
        var_name
    ));

    let err = Config::from_file(file.path()).unwrap_err().to_string();
    assert!(err.contains(var_name), "Error should name the variable: {}", err);
}

#[test]
fn test_env_key_is_read_on_each_resolve() {
    let var_name = "GEMRELAY_FILE_TEST_04_KEY";
    std::env::remove_var(var_name);

    let file = write_config(&format!(
        r#"
[upstream]
api_key_env = "{}"
"#,
        var_name
    ));
    let config = Config::from_file(file.path()).expect("config should load");

    assert!(config.upstream.resolve_api_key().is_none());
    assert_eq!(config.upstream.key_source(), KeySource::None);

    std::env::set_var(var_name, "first");
    assert_eq!(
        config.upstream.resolve_api_key().unwrap().expose_secret(),
        "first"
    );
    assert_eq!(
        config.upstream.key_source(),
        KeySource::Environment(var_name.to_string())
    );

    std::env::set_var(var_name, "rotated");
    assert_eq!(
        config.upstream.resolve_api_key().unwrap().expose_secret(),
        "rotated"
    );

    std::env::remove_var(var_name);
}
