//! Configuration for the server and the terminal client.

use crate::games::tictactoe::Role;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Settings for the reference authoritative server.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind to.
    #[serde(default = "default_port")]
    port: u16,
}

/// Settings for a playing client.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the server (`http://`, `https://`, `ws://` or `wss://`).
    #[serde(default = "default_server_url")]
    server_url: String,

    /// Session to join.
    #[serde(default)]
    session_id: Option<String>,

    /// Role in the session.
    #[serde(default)]
    role: Option<Role>,
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Getters, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server section.
    #[serde(default)]
    server: ServerConfig,

    /// Client section.
    #[serde(default)]
    client: ClientConfig,
}

#[instrument]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[instrument]
fn default_port() -> u16 {
    3000
}

#[instrument]
fn default_server_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            session_id: None,
            role: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!("Config loaded successfully");
        Ok(config)
    }

    /// Loads the file if given, otherwise returns defaults.
    #[instrument(skip(path))]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Mutable server section, for command-line overrides.
    pub fn server_mut(&mut self) -> &mut ServerConfig {
        &mut self.server
    }

    /// Mutable client section, for command-line overrides.
    pub fn client_mut(&mut self) -> &mut ClientConfig {
        &mut self.client
    }
}

impl ServerConfig {
    /// Applies command-line overrides.
    pub fn override_with(&mut self, host: Option<String>, port: Option<u16>) {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
    }

    /// `host:port` bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ClientConfig {
    /// Applies command-line overrides.
    pub fn override_with(
        &mut self,
        server_url: Option<String>,
        session_id: Option<String>,
        role: Option<Role>,
    ) {
        if let Some(server_url) = server_url {
            self.server_url = server_url;
        }
        if session_id.is_some() {
            self.session_id = session_id;
        }
        if role.is_some() {
            self.role = role;
        }
    }

    /// WebSocket URL of a session's socket.
    ///
    /// HTTP schemes are swapped for their WebSocket equivalents.
    #[instrument(skip(self))]
    pub fn socket_url(&self, session_id: &str) -> String {
        let base = self.server_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("http") {
            format!("ws{rest}")
        } else {
            base.to_string()
        };
        format!("{base}/game/{session_id}/socket")
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
