//! O Store: storefront and admin backend for a Google Sheets shop
//!
//! Products and orders live in a spreadsheet. Reads go through a tiered
//! chain (Apps Script web app, Sheets REST API, local cache, optional demo
//! data); writes go through the Apps Script web app with a local backup.
//!
//! ## Features
//! - Product catalog with category filtering
//! - Per-session carts and checkout
//! - Order placement, listing and status tracking
//! - Admin dashboard and connection checks

pub mod apps_script;
pub mod config;
pub mod domain;
pub mod http;
pub mod resolver;
pub mod services;
pub mod sheets;
pub mod state;
pub mod store;

use thiserror::Error;

use crate::apps_script::AppsScriptError;
use crate::config::ConfigError;
use crate::domain::aggregates::{CartError, OrderError};
use crate::resolver::ResolveError;
use crate::sheets::SheetsError;
use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum OStoreError {
    /// Rejected input; the message is shown to the shopper as is.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// A write needs the Apps Script web app and none is configured.
    #[error("{0} n'est pas configuré")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Sheets(#[from] SheetsError),

    #[error(transparent)]
    AppsScript(#[from] AppsScriptError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl From<OrderError> for OStoreError {
    fn from(e: OrderError) -> Self { Self::Validation(e.to_string()) }
}

impl From<CartError> for OStoreError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => Self::NotFound(e.to_string()),
            CartError::InvalidQuantity => Self::Validation(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OStoreError>;
