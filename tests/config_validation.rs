//! Integration tests for settings loading and validation

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use lookup_protocol::config::{
    ClientConfig, LoggingConfig, ServerConfig, Settings, DEFAULT_BANNER, DEFAULT_GREETING,
};
use lookup_protocol::error::ProtocolError;
use lookup_protocol::protocol::message::LookupQuery;
use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

fn settings() -> Settings {
    Settings::new(
        SocketAddr::from(([127, 0, 0, 1], 32000)),
        SocketAddr::from(([127, 0, 0, 1], 32001)),
    )
}

#[test]
fn test_default_settings_validate() {
    let errors = settings().validate();
    assert!(
        errors.is_empty(),
        "Default settings should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_exercise_setting_file_format() {
    let json = r#"{
        "ServerIPAddress": "127.0.0.1",
        "ServerPortNumber": 32000,
        "ClientIPAddress": "127.0.0.1",
        "ClientPortNumber": 32001
    }"#;
    let settings = Settings::from_json(json).expect("parse");

    assert_eq!(
        settings.server_endpoint().unwrap(),
        "127.0.0.1:32000".parse::<SocketAddr>().unwrap()
    );
    assert_eq!(
        settings.client_endpoint().unwrap(),
        "127.0.0.1:32001".parse::<SocketAddr>().unwrap()
    );
    assert_eq!(settings.server.banner, DEFAULT_BANNER);
    assert_eq!(settings.client.greeting, DEFAULT_GREETING);
    assert_eq!(settings.client.lookups.len(), 4);
    assert!(settings.client.response_timeout_ms.is_none());
    assert!(settings.server.idle_timeout_ms.is_none());
}

#[test]
fn test_missing_endpoint_field_is_config_error() {
    let json = r#"{"ServerIPAddress": "127.0.0.1", "ServerPortNumber": 32000, "ClientIPAddress": "127.0.0.1"}"#;
    assert!(matches!(
        Settings::from_json(json),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
fn test_out_of_range_port_is_config_error() {
    let json = r#"{"ServerIPAddress": "127.0.0.1", "ServerPortNumber": 70000, "ClientIPAddress": "127.0.0.1", "ClientPortNumber": 32001}"#;
    assert!(matches!(
        Settings::from_json(json),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
fn test_toml_with_optional_sections() {
    let toml = r#"
        server_address = "127.0.0.1"
        server_port = 32000
        client_address = "127.0.0.1"
        client_port = 32001

        [server]
        banner = "Hi there"
        max_sessions = 8
        idle_timeout_ms = 30000

        [client]
        response_timeout_ms = 2000
        lookups = [{ type = "MX", name = "example.com" }]

        [logging]
        log_level = "debug"
    "#;
    let settings = Settings::from_toml(toml).expect("parse");

    assert_eq!(settings.server.banner, "Hi there");
    assert_eq!(settings.server.max_sessions, 8);
    assert_eq!(
        settings.server.idle_timeout_ms,
        Some(Duration::from_secs(30))
    );
    assert_eq!(
        settings.client.response_timeout_ms,
        Some(Duration::from_secs(2))
    );
    assert_eq!(
        settings.client.lookups,
        vec![LookupQuery::new("MX", "example.com")]
    );
    assert_eq!(settings.logging.log_level, Level::DEBUG);
    assert!(settings.validate().is_empty());
}

#[test]
fn test_from_file_picks_format_by_extension() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    write!(
        file,
        "server_address = \"127.0.0.1\"\nserver_port = 1\nclient_address = \"127.0.0.1\"\nclient_port = 2\n"
    )
    .unwrap();

    let settings = Settings::from_file(file.path()).expect("load");
    assert_eq!(settings.server_port, 1);
    assert_eq!(settings.client_port, 2);
}

#[test]
fn test_missing_file_is_config_error() {
    assert!(matches!(
        Settings::from_file("/nonexistent/Setting.json"),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
fn test_example_config_round_trips() {
    let example = Settings::example_config();
    let settings = Settings::from_toml(&example).expect("example config parses");
    assert!(settings.validate().is_empty());
}

#[test]
fn test_invalid_server_address() {
    let mut settings = settings();
    settings.server_address = "localhost:abc".to_string();

    let errors = settings.validate();
    assert!(errors.iter().any(|e| e.contains("Invalid server address")));
    assert!(matches!(
        settings.server_endpoint(),
        Err(ProtocolError::ConfigError(_))
    ));
}

#[test]
fn test_empty_client_address() {
    let mut settings = settings();
    settings.client_address = String::new();

    let errors = settings.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_zero_server_port() {
    let mut settings = settings();
    settings.server_port = 0;

    let errors = settings.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Server port must be greater than 0")));
}

#[test]
fn test_zero_max_sessions() {
    let config = ServerConfig {
        max_sessions: 0,
        ..ServerConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Max sessions must be greater than 0")));
}

#[test]
fn test_missing_required_records() {
    let config = ServerConfig {
        records_path: Some("/nonexistent/DNSrecords.json".into()),
        ..ServerConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Lookup table not found")));

    let relaxed = ServerConfig {
        require_records: false,
        ..config
    };
    assert!(relaxed.validate().is_empty());
}

#[test]
fn test_short_timeouts_rejected() {
    let client = ClientConfig {
        response_timeout_ms: Some(Duration::from_millis(1)),
        ..ClientConfig::default()
    };
    assert!(client
        .validate()
        .iter()
        .any(|e| e.contains("Response timeout too short")));

    let server = ServerConfig {
        idle_timeout_ms: Some(Duration::from_millis(1)),
        ..ServerConfig::default()
    };
    assert!(server
        .validate()
        .iter()
        .any(|e| e.contains("Idle timeout too short")));
}

#[test]
fn test_incomplete_lookup_rejected() {
    let client = ClientConfig {
        lookups: vec![LookupQuery::new("", "example.com")],
        ..ClientConfig::default()
    };
    assert!(client
        .validate()
        .iter()
        .any(|e| e.contains("Lookup needs both")));
}

#[test]
fn test_empty_app_name() {
    let logging = LoggingConfig {
        app_name: String::new(),
        ..LoggingConfig::default()
    };
    assert!(logging
        .validate()
        .iter()
        .any(|e| e.contains("Application name cannot be empty")));
}

#[test]
fn test_validate_strict_collects_every_problem() {
    let mut settings = settings();
    settings.server_port = 0;
    settings.server.max_sessions = 0;

    match settings.validate_strict() {
        Err(ProtocolError::ConfigError(msg)) => {
            assert!(msg.contains("Server port"));
            assert!(msg.contains("Max sessions"));
        }
        other => panic!("Expected ConfigError, got {other:?}"),
    }
}
