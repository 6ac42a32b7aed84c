//! Configuration loading and representation.

use std::net::SocketAddr;

use thiserror::Error;

use stockyard_observability::LogFormat;

pub const BIND_ADDR: &str = "STOCKYARD_BIND_ADDR";
pub const LOG_FORMAT: &str = "STOCKYARD_LOG_FORMAT";
pub const CODE_PREFIX_IMPORT: &str = "STOCKYARD_CODE_PREFIX_IMPORT";
pub const CODE_PREFIX_EXPORT: &str = "STOCKYARD_CODE_PREFIX_EXPORT";
pub const CODE_PREFIX_ORDER: &str = "STOCKYARD_CODE_PREFIX_ORDER";
pub const CODE_PREFIX_CHECK: &str = "STOCKYARD_CODE_PREFIX_CHECK";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Prefixes of generated document codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodePrefixes {
    /// Supplier import receipts.
    pub import: String,
    /// Internal exports.
    pub export: String,
    /// Import orders.
    pub order: String,
    /// Inventory checks.
    pub check: String,
}

impl Default for CodePrefixes {
    fn default() -> Self {
        Self {
            import: "PN".to_string(),
            export: "PX".to_string(),
            order: "DH".to_string(),
            check: "KK".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    pub code_prefixes: CodePrefixes,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_format: LogFormat::Json,
            code_prefixes: CodePrefixes::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from `STOCKYARD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable source; unset variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(value) = lookup(BIND_ADDR) {
            config.bind_addr = value.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid {
                    var: BIND_ADDR,
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        if let Some(value) = lookup(LOG_FORMAT) {
            config.log_format = value.parse().map_err(|reason| ConfigError::Invalid {
                var: LOG_FORMAT,
                value: value.clone(),
                reason,
            })?;
        }

        let prefixes = &mut config.code_prefixes;
        for (var, slot) in [
            (CODE_PREFIX_IMPORT, &mut prefixes.import),
            (CODE_PREFIX_EXPORT, &mut prefixes.export),
            (CODE_PREFIX_ORDER, &mut prefixes.order),
            (CODE_PREFIX_CHECK, &mut prefixes.check),
        ] {
            if let Some(value) = lookup(var) {
                *slot = parse_prefix(var, &value)?;
            }
        }

        Ok(config)
    }
}

fn parse_prefix(var: &'static str, value: &str) -> Result<String, ConfigError> {
    let prefix = value.trim();
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "prefix must be non-empty ASCII alphanumerics".to_string(),
        });
    }
    Ok(prefix.to_ascii_uppercase())
}
