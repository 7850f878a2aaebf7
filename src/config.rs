//! # Configuration Management
//!
//! Settings shared by the lookup server and client.
//!
//! The four endpoint fields (server address/port, client address/port) are
//! required. Everything else has a default, so a four-field
//! `Setting.json` is a valid configuration on its own:
//!
//! ```json
//! {
//!   "ServerIPAddress": "127.0.0.1",
//!   "ServerPortNumber": 32000,
//!   "ClientIPAddress": "127.0.0.1",
//!   "ClientPortNumber": 32001
//! }
//! ```
//!
//! ## Configuration Sources
//! - JSON or TOML files via `from_file()` (chosen by extension)
//! - Environment overrides via `apply_env()`
//! - Both plus validation via `load()`
//!
//! Receive timeouts default to off: a lost datagram blocks the waiting side,
//! exactly like the plain blocking exchange. Set `response_timeout_ms` /
//! `idle_timeout_ms` to opt in.

use crate::error::{ProtocolError, Result};
use crate::protocol::message::LookupQuery;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Default Welcome banner
pub const DEFAULT_BANNER: &str = "Welcome from server";

/// Default Hello text
pub const DEFAULT_GREETING: &str = "Hello from client";

/// Default bound on concurrently tracked peers
pub const DEFAULT_MAX_SESSIONS: usize = 64;

/// Top-level settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(alias = "ServerIPAddress")]
    pub server_address: String,

    #[serde(alias = "ServerPortNumber")]
    pub server_port: u16,

    #[serde(alias = "ClientIPAddress")]
    pub client_address: String,

    #[serde(alias = "ClientPortNumber")]
    pub client_port: u16,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Settings for the given endpoints with every optional section defaulted
    pub fn new(server: SocketAddr, client: SocketAddr) -> Self {
        Self {
            server_address: server.ip().to_string(),
            server_port: server.port(),
            client_address: client.ip().to_string(),
            client_port: client.port(),
            server: ServerConfig::default(),
            client: ClientConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load settings from a `.json` or `.toml` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ProtocolError::ConfigError(format!(
                "Failed to read settings file {}: {e}",
                path.display()
            ))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&contents),
            _ => Self::from_json(&contents),
        }
    }

    /// Read `path`, apply environment overrides, and validate the result
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut settings = Self::from_file(path)?;
        settings.apply_env();
        settings.validate_strict()?;
        Ok(settings)
    }

    /// Load settings from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse JSON: {e}")))
    }

    /// Load settings from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Override endpoint fields from `LOOKUP_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("LOOKUP_SERVER_ADDRESS") {
            self.server_address = addr;
        }
        if let Ok(port) = std::env::var("LOOKUP_SERVER_PORT") {
            if let Ok(val) = port.parse::<u16>() {
                self.server_port = val;
            }
        }
        if let Ok(addr) = std::env::var("LOOKUP_CLIENT_ADDRESS") {
            self.client_address = addr;
        }
        if let Ok(port) = std::env::var("LOOKUP_CLIENT_PORT") {
            if let Ok(val) = port.parse::<u16>() {
                self.client_port = val;
            }
        }
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        let example = Self::new(
            SocketAddr::from(([127, 0, 0, 1], 32000)),
            SocketAddr::from(([127, 0, 0, 1], 32001)),
        );
        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Server endpoint
    pub fn server_endpoint(&self) -> Result<SocketAddr> {
        endpoint("server", &self.server_address, self.server_port)
    }

    /// Client endpoint
    pub fn client_endpoint(&self) -> Result<SocketAddr> {
        endpoint("client", &self.client_address, self.client_port)
    }

    /// Validate the settings for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means the settings are valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.server_address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.server_address.parse::<IpAddr>().is_err() {
            errors.push(format!(
                "Invalid server address: '{}' (expected an IP address such as '127.0.0.1')",
                self.server_address
            ));
        }

        if self.server_port == 0 {
            errors.push("Server port must be greater than 0".to_string());
        }

        if self.client_address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else if self.client_address.parse::<IpAddr>().is_err() {
            errors.push(format!(
                "Invalid client address: '{}' (expected an IP address such as '127.0.0.1')",
                self.client_address
            ));
        }

        errors.extend(self.server.validate());
        errors.extend(self.client.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn endpoint(role: &str, address: &str, port: u16) -> Result<SocketAddr> {
    let ip = address.parse::<IpAddr>().map_err(|e| {
        ProtocolError::ConfigError(format!("Invalid {role} address '{address}': {e}"))
    })?;
    Ok(SocketAddr::new(ip, port))
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Lookup table source (JSON array of records)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_path: Option<PathBuf>,

    /// Exit when the table cannot be loaded; otherwise answer every lookup with NotFound
    pub require_records: bool,

    /// Text carried by Welcome
    pub banner: String,

    /// Maximum number of peers tracked at once
    pub max_sessions: usize,

    /// Send End to sessions that stay silent this long
    #[serde(with = "opt_duration_serde", skip_serializing_if = "Option::is_none")]
    pub idle_timeout_ms: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            records_path: None,
            require_records: true,
            banner: String::from(DEFAULT_BANNER),
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout_ms: None,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_sessions == 0 {
            errors.push("Max sessions must be greater than 0".to_string());
        }

        if let Some(timeout) = self.idle_timeout_ms {
            if timeout.as_millis() < 10 {
                errors.push("Idle timeout too short (minimum: 10ms)".to_string());
            }
        }

        if let Some(ref path) = self.records_path {
            if self.require_records && !path.exists() {
                errors.push(format!("Lookup table not found: {}", path.display()));
            }
        }

        errors
    }
}

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Text carried by Hello
    pub greeting: String,

    /// Give up waiting for a reply after this long
    #[serde(with = "opt_duration_serde", skip_serializing_if = "Option::is_none")]
    pub response_timeout_ms: Option<Duration>,

    /// Queries sent in order, one per round
    pub lookups: Vec<LookupQuery>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            greeting: String::from(DEFAULT_GREETING),
            response_timeout_ms: None,
            lookups: default_lookups(),
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(timeout) = self.response_timeout_ms {
            if timeout.as_millis() < 10 {
                errors.push("Response timeout too short (minimum: 10ms)".to_string());
            }
        }

        for query in &self.lookups {
            if query.record_type.is_empty() || query.name.is_empty() {
                errors.push(format!(
                    "Lookup needs both a record type and a name: '{query}'"
                ));
            }
        }

        errors
    }
}

/// Default query list: two keys that exist in the sample table, two that do not
pub fn default_lookups() -> Vec<LookupQuery> {
    vec![
        LookupQuery::new("A", "www.outlook.com"),
        LookupQuery::new("MX", "example.com"),
        LookupQuery::new("A", "www.nonexistent.com"),
        LookupQuery::new("M", "exampl.com"),
    ]
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("lookup-protocol"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for optional millisecond Durations
mod opt_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => serializer.serialize_u64(duration.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
