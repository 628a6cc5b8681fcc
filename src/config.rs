//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `OSTORE_SPREADSHEET_ID` - Google Spreadsheet holding the product and order tabs
//! - `OSTORE_SHEETS_API_KEY` - Google Sheets API key (never sent to browsers)
//!
//! ## Optional
//! - `OSTORE_APPS_SCRIPT_URL` - Apps Script web app URL (enables spreadsheet writes)
//! - `OSTORE_SHEETS_API_BASE` - Sheets REST base URL (default: <https://sheets.googleapis.com>)
//! - `OSTORE_PRODUCTS_SHEET` - Products tab (default: `SHEETS_PRODUCTS`)
//! - `OSTORE_ORDERS_SHEET` - Orders tab (default: `SHEETS_ORDERS`)
//! - `OSTORE_DATA_DIR` - Local store directory (default: `./data`)
//! - `OSTORE_FALLBACK` - `explicit` or `demo` (default: `explicit`)
//! - `OSTORE_CURRENCY` - Currency label for totals (default: `DA`)
//! - `OSTORE_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `PORT` - Listen port (default: 8083)

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::resolver::FallbackPolicy;

const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
const DEFAULT_PRODUCTS_SHEET: &str = "SHEETS_PRODUCTS";
const DEFAULT_ORDERS_SHEET: &str = "SHEETS_ORDERS";
const DEFAULT_CURRENCY: &str = "DA";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PORT: u16 = 8083;

/// Deployment placeholders that mean "no Apps Script yet".
const SCRIPT_PLACEHOLDERS: &[&str] = &["YOUR_SCRIPT_ID", "your-script", "placeholder"];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Google Sheets access.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    /// Redacted in `Debug` by `SecretString`.
    pub api_key: SecretString,
    pub api_base: String,
    pub products_sheet: String,
    pub orders_sheet: String,
}

impl SheetsConfig {
    /// A1 range covering the product columns `ID..Created`.
    pub fn products_range(&self) -> String { format!("{}!A:G", self.products_sheet) }

    /// A1 range covering the order columns `ID..Date`.
    pub fn orders_range(&self) -> String { format!("{}!A:I", self.orders_sheet) }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sheets: SheetsConfig,
    pub apps_script_url: Option<String>,
    pub data_dir: PathBuf,
    pub fallback: FallbackPolicy,
    pub currency: String,
    pub request_timeout: Duration,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Load configuration from an explicit variable map.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not parse.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let sheets = SheetsConfig {
            spreadsheet_id: required("OSTORE_SPREADSHEET_ID")?,
            api_key: SecretString::from(required("OSTORE_SHEETS_API_KEY")?),
            api_base: get("OSTORE_SHEETS_API_BASE")
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            products_sheet: get("OSTORE_PRODUCTS_SHEET").unwrap_or_else(|| DEFAULT_PRODUCTS_SHEET.to_string()),
            orders_sheet: get("OSTORE_ORDERS_SHEET").unwrap_or_else(|| DEFAULT_ORDERS_SHEET.to_string()),
        };

        let apps_script_url = get("OSTORE_APPS_SCRIPT_URL").filter(|url| !is_placeholder(url));
        if let Some(url) = &apps_script_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidEnvVar("OSTORE_APPS_SCRIPT_URL".into(), format!("not an http(s) URL: {url}")));
            }
        }

        let fallback = match get("OSTORE_FALLBACK") {
            Some(raw) => FallbackPolicy::from_str(&raw).map_err(|e| ConfigError::InvalidEnvVar("OSTORE_FALLBACK".into(), e))?,
            None => FallbackPolicy::default(),
        };

        Ok(Self {
            sheets,
            apps_script_url,
            data_dir: get("OSTORE_DATA_DIR").map_or_else(|| PathBuf::from("./data"), PathBuf::from),
            fallback,
            currency: get("OSTORE_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            request_timeout: Duration::from_secs(parse_or("OSTORE_REQUEST_TIMEOUT_SECS", get("OSTORE_REQUEST_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS)?),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
        })
    }
}

fn is_placeholder(url: &str) -> bool {
    let lower = url.to_lowercase();
    SCRIPT_PLACEHOLDERS.iter().any(|p| lower.contains(&p.to_lowercase()))
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |v| v.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())))
}
