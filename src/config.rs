use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use url::Url;

pub const GATEWAY_TIMEOUT_MIN_SECS: u64 = 10;
pub const GATEWAY_TIMEOUT_MAX_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Required for everything except in-memory serving.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub gateway_base_url: String,
    pub gateway_server_key: String,
    pub gateway_timeout_secs: u64,
    pub gateway_failure_threshold: u32,
    pub gateway_reset_timeout_secs: u64,
    pub admin_api_key: String,
    pub log_format: LogFormat,
    pub log_request_body: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gateway_base_url = get("GATEWAY_BASE_URL")
            .unwrap_or_else(|| "https://api.sandbox.midtrans.com".to_string());
        Url::parse(&gateway_base_url)
            .with_context(|| format!("GATEWAY_BASE_URL is not a valid URL: {}", gateway_base_url))?;

        let gateway_timeout_secs = parse_or(&get, "GATEWAY_TIMEOUT_SECS", 15u64)?;
        if !(GATEWAY_TIMEOUT_MIN_SECS..=GATEWAY_TIMEOUT_MAX_SECS).contains(&gateway_timeout_secs) {
            bail!(
                "GATEWAY_TIMEOUT_SECS must be between {} and {}",
                GATEWAY_TIMEOUT_MIN_SECS,
                GATEWAY_TIMEOUT_MAX_SECS
            );
        }

        let gateway_failure_threshold = parse_or(&get, "GATEWAY_FAILURE_THRESHOLD", 3u32)?;
        if gateway_failure_threshold == 0 {
            bail!("GATEWAY_FAILURE_THRESHOLD must be at least 1");
        }

        let database_max_connections = parse_or(&get, "DATABASE_MAX_CONNECTIONS", 5u32)?;
        if database_max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }

        Ok(Config {
            server_port: parse_or(&get, "SERVER_PORT", 3000u16)?,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            gateway_base_url,
            gateway_server_key: get("GATEWAY_SERVER_KEY").context("GATEWAY_SERVER_KEY is required")?,
            gateway_timeout_secs,
            gateway_failure_threshold,
            gateway_reset_timeout_secs: parse_or(&get, "GATEWAY_RESET_TIMEOUT_SECS", 60u64)?,
            admin_api_key: get("ADMIN_API_KEY").context("ADMIN_API_KEY is required")?,
            log_format: get("LOG_FORMAT")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(LogFormat::Text),
            log_request_body: parse_or(&get, "LOG_REQUEST_BODY", false)?,
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL is required")
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", key, e)),
        None => Ok(default),
    }
}

/// Replaces the password in a connection URL with `****`.
pub fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}
