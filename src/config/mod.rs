//! Process configuration read from the environment (and `.env`, when present).

use std::fmt;

use thiserror::Error;

pub const DEFAULT_ICP_HOST: &str = "https://ic0.app";
pub const DEFAULT_CANISTER_ID: &str = "ypo2z-ayaaa-aaaam-qdjka-cai";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployment environment. Diagnostics routes are only mounted outside production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "test" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub icp_host: String,
    pub icp_canister_id: String,
    /// Solana JSON-RPC endpoint. Token lookups fail while unset.
    pub solana_rpc_url: Option<String>,
    pub database_path: String,
}

impl Config {
    /// Loads `.env` (if any) and reads the process environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] when `PORT` is not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenv::dotenv() {
            tracing::debug!(error = %e, "no .env file loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "PORT",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => 3000,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
            environment: get("APP_ENV")
                .map(|raw| Environment::parse(&raw))
                .unwrap_or_default(),
            icp_host: get("ICP_HOST").unwrap_or_else(|| DEFAULT_ICP_HOST.to_owned()),
            icp_canister_id: get("ICP_CANISTER_ID")
                .unwrap_or_else(|| DEFAULT_CANISTER_ID.to_owned()),
            solana_rpc_url: get("SOLANA_RPC_URL"),
            database_path: get("DATABASE_PATH").unwrap_or_else(|| "request_logs.db".to_owned()),
        })
    }

    /// `host:port` for [`Server::bind`](crate::server::Server::bind).
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `true` when talking to a local replica, which needs its root key fetched.
    pub fn icp_is_local(&self) -> bool {
        self.icp_host.contains("localhost") || self.icp_host.contains("127.0.0.1")
    }
}
