//! Server configuration
//!
//! Read from `EWM_*` environment variables; the binary loads a `.env` file
//! first when one is present.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_APP_NAME: &str = "ewm-main-service";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Runtime settings of the server
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// `EWM_BIND_ADDR`
    pub bind_addr: SocketAddr,
    /// `EWM_APP_NAME`; the app recorded on hits of public reads
    pub app_name: String,
    /// `EWM_DATA_DIR`; enables the on-disk journal
    pub data_dir: Option<PathBuf>,
    /// `EWM_UNIQUE_VIEWS`; count views by distinct ip
    pub unique_views: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            app_name: DEFAULT_APP_NAME.to_string(),
            data_dir: None,
            unique_views: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("EWM_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr.trim().parse().map_err(|_| ConfigError::Invalid {
            var: "EWM_BIND_ADDR",
            expected: "socket address",
            value: bind_addr.clone(),
        })?;

        let unique_views = match get("EWM_UNIQUE_VIEWS") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                var: "EWM_UNIQUE_VIEWS",
                expected: "boolean",
                value: raw,
            })?,
            None => true,
        };

        Ok(Self {
            bind_addr,
            app_name: get("EWM_APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            data_dir: get("EWM_DATA_DIR").map(PathBuf::from),
            unique_views,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
