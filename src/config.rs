//! Configuration loading from environment variables.

use crate::error::{ConfigError, Result};

/// Default port for the webhook listener.
const DEFAULT_WEBHOOK_PORT: u16 = 9898;

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Figma personal access token. Held for the upstream API client; the
    /// bridge itself never fetches file content.
    pub figma_token: String,

    /// Shared secret expected in every webhook payload.
    pub webhook_passcode: String,

    /// Port the webhook listener binds on.
    pub webhook_port: u16,

    /// Matrix connection settings.
    pub matrix: MatrixConfig,

    /// Room holding the global admin configuration; also the catch-all
    /// relay target for comments on untracked files.
    pub admin_room: String,
}

/// Matrix homeserver connection settings.
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    /// Homeserver base URL, e.g. `https://matrix.example.com`.
    pub homeserver_url: String,

    /// Access token for the bridge user.
    pub access_token: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let webhook_port = match std::env::var("WEBHOOK_PORT") {
            Ok(value) => value.parse().map_err(|_| {
                ConfigError::Invalid(format!("WEBHOOK_PORT is not a valid port: {value}"))
            })?,
            Err(_) => DEFAULT_WEBHOOK_PORT,
        };

        Ok(Self {
            figma_token: require("FIGMA_TOKEN")?,
            webhook_passcode: require("WEBHOOK_PASSCODE")?,
            webhook_port,
            matrix: MatrixConfig {
                homeserver_url: require("MATRIX_HOMESERVER_URL")?,
                access_token: require("MATRIX_ACCESS_TOKEN")?,
            },
            admin_room: require("TARGET_ROOM")?,
        })
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ConfigError::MissingKey(key.to_string()).into())
}
