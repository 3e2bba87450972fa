//! Runtime settings for the command line tool.
//!
//! Read from an optional `split-engine.toml` (or an explicit path), then from
//! `SPLIT_ENGINE_*` environment variables, which win.
use crate::core::currency::{Currency, CurrencyCode, CurrencyTable, FxError};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_FILE: &str = "split-engine";
pub const ENV_PREFIX: &str = "SPLIT_ENGINE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Error)]
#[error("unknown output format '{0}', expected text or json")]
pub struct UnknownOutputFormat(String);

impl FromStr for OutputFormat {
    type Err = UnknownOutputFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(UnknownOutputFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_base_currency() -> CurrencyCode {
    CurrencyCode::new("EUR")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// `env_logger` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_base_currency")]
    pub base_currency: CurrencyCode,
    /// Reference currency rows; scenario files may override them per code.
    #[serde(default = "Currency::seed")]
    pub currencies: Vec<Currency>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            output_format: OutputFormat::default(),
            base_currency: default_base_currency(),
            currencies: Currency::seed(),
        }
    }
}

impl Settings {
    /// Load from `path` (required when given) or the optional default file,
    /// then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Settings from an inline TOML document, no environment.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn currency_table(&self) -> Result<CurrencyTable, FxError> {
        CurrencyTable::from_currencies(self.base_currency.clone(), self.currencies.iter().cloned())
    }
}
