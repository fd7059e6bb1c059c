//! Configuration from environment variables (`.env` is loaded by `main`).
//!
//! Every subcommand needs the Discord credentials; only `serve` needs the
//! endpoint, channel and sheet settings, so they load separately. Loaders
//! take a lookup function so tests never touch the process environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::channels::DiscordConfig;
use crate::channels::discord::DEFAULT_API_BASE;
use crate::error::ConfigError;
use crate::sheets::DEFAULT_SHEETS_BASE;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SHEET_NAME: &str = "log";

/// Read a variable from the real environment.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    optional(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn snowflake(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    let value = required(lookup, key)?;
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a numeric Discord id, got {:?}", value),
        });
    }
    Ok(value)
}

/// Discord credentials shared by every subcommand.
#[derive(Debug, Clone)]
pub struct DiscordSettings {
    pub rest: DiscordConfig,
    pub guild_id: Option<String>,
}

impl DiscordSettings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = optional(&lookup, "DISCORD_BOT_TOKEN")
            .or_else(|| optional(&lookup, "BOT_TOKEN"))
            .ok_or_else(|| ConfigError::MissingEnvVar("DISCORD_BOT_TOKEN".to_string()))?;

        let mut rest = DiscordConfig::new(
            SecretString::from(token),
            snowflake(&lookup, "DISCORD_APPLICATION_ID")?,
        );
        rest.api_base =
            optional(&lookup, "DISCORD_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self {
            rest,
            guild_id: optional(&lookup, "DISCORD_GUILD_ID"),
        })
    }
}

/// Settings for running the interactions endpoint.
#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub public_key: String,
    pub target_channel_id: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub service_account_file: PathBuf,
    pub sheets_base: String,
    pub bind_addr: SocketAddr,
}

impl ServeSettings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw =
            optional(&lookup, "BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                key: "BIND_ADDR".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            public_key: required(&lookup, "DISCORD_PUBLIC_KEY")?,
            target_channel_id: snowflake(&lookup, "TARGET_CHANNEL_ID")?,
            spreadsheet_id: required(&lookup, "SPREADSHEET_ID")?,
            sheet_name: optional(&lookup, "SHEET_NAME")
                .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            service_account_file: PathBuf::from(required(&lookup, "GOOGLE_SERVICE_ACCOUNT_FILE")?),
            sheets_base: optional(&lookup, "SHEETS_API_BASE")
                .unwrap_or_else(|| DEFAULT_SHEETS_BASE.to_string()),
            bind_addr,
        })
    }
}
