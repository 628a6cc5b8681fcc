//! Local JSON key/value store.
//!
//! Holds the order backup, the product cache, shopping carts and admin
//! settings under the same key names the browser pages used for
//! `localStorage`. Each key is one `<key>.json` file. Every read-modify-write
//! runs under one async mutex and files are replaced atomically, so two
//! concurrent order submissions both land.

use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::aggregates::{Cart, Order, OrderStatus, Product};

pub const ORDERS_KEY: &str = "ostore-orders";
/// Written by an older order page; read and merged, never written.
pub const LEGACY_ORDERS_KEY: &str = "orders";
pub const PRODUCTS_KEY: &str = "ostore-products";
pub const CARTS_KEY: &str = "selectedProducts";
pub const SETTINGS_KEY: &str = "ostore-admin-settings";

/// Errors that can occur in the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error on {key}: {source}")]
    Io { key: String, #[source] source: std::io::Error },

    #[error("Corrupt JSON under {key}: {source}")]
    Corrupt { key: String, #[source] source: serde_json::Error },
}

/// Admin page settings. The API key stays in server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub script_url: String,
}

/// File-backed store rooted at one directory.
#[derive(Debug)]
pub struct LocalStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl LocalStore {
    /// Open (and create if needed) the store directory.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|source| StoreError::Io { key: dir.display().to_string(), source })?;
        Ok(Self { dir, lock: Mutex::new(()) })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path(&self, key: &str) -> PathBuf { self.dir.join(format!("{key}.json")) }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|source| StoreError::Corrupt { key: key.to_string(), source }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { key: key.to_string(), source }),
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Corrupt { key: key.to_string(), source })?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&tmp, bytes).await.map_err(|source| StoreError::Io { key: key.to_string(), source })?;
        tokio::fs::rename(&tmp, self.path(key)).await.map_err(|source| StoreError::Io { key: key.to_string(), source })?;
        debug!(key, "store key written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { key: key.to_string(), source }),
        }
    }

    // ---------------------------------------------------------------------
    // Orders
    // ---------------------------------------------------------------------

    /// Every locally backed-up order, oldest first, including the legacy key.
    ///
    /// # Errors
    ///
    /// Returns error if a key cannot be read or holds invalid JSON.
    pub async fn orders(&self) -> Result<Vec<Order>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_orders().await
    }

    async fn read_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self.read(ORDERS_KEY).await?.unwrap_or_default();
        let legacy: Vec<Order> = match self.read(LEGACY_ORDERS_KEY).await {
            Ok(found) => found.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable legacy orders");
                vec![]
            }
        };
        if !legacy.is_empty() {
            let known: HashSet<String> = orders.iter().map(|o| o.id.clone()).collect();
            orders.extend(legacy.into_iter().filter(|o| !known.contains(&o.id)));
            orders.sort_by_key(|o| o.placed_at());
        }
        Ok(orders)
    }

    /// Append an order to the backup. Existing orders are never replaced: an
    /// id collision bumps the new order's id to the next free value.
    ///
    /// Returns the order as stored.
    ///
    /// # Errors
    ///
    /// Returns error if the backup cannot be read or written.
    pub async fn append_order(&self, mut order: Order) -> Result<Order, StoreError> {
        let _guard = self.lock.lock().await;
        let mut orders: Vec<Order> = self.read(ORDERS_KEY).await?.unwrap_or_default();
        let taken: HashSet<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        if taken.contains(order.id.as_str()) {
            let mut candidate = order.id.parse::<i64>().unwrap_or_default();
            let fresh = loop {
                candidate += 1;
                let id = candidate.to_string();
                if !taken.contains(id.as_str()) { break id; }
            };
            order.id = fresh;
        }
        orders.push(order.clone());
        self.write(ORDERS_KEY, &orders).await?;
        Ok(order)
    }

    /// Set the status of a backed-up order. Returns the updated order, or
    /// `None` when no local order has that id.
    ///
    /// # Errors
    ///
    /// Returns error if the backup cannot be read or written.
    pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<Option<Order>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut orders: Vec<Order> = self.read(ORDERS_KEY).await?.unwrap_or_default();
        let Some(order) = orders.iter_mut().find(|o| o.id == id) else { return Ok(None) };
        order.set_status(status);
        let updated = order.clone();
        self.write(ORDERS_KEY, &orders).await?;
        Ok(Some(updated))
    }

    /// Drop the order backup (both keys).
    ///
    /// # Errors
    ///
    /// Returns error if a file cannot be removed.
    pub async fn clear_orders(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.remove(ORDERS_KEY).await?;
        self.remove(LEGACY_ORDERS_KEY).await
    }

    // ---------------------------------------------------------------------
    // Product cache
    // ---------------------------------------------------------------------

    /// Last product list served by a remote source.
    ///
    /// # Errors
    ///
    /// Returns error if the cache cannot be read.
    pub async fn cached_products(&self) -> Result<Vec<Product>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read(PRODUCTS_KEY).await?.unwrap_or_default())
    }

    /// Replace the product cache.
    ///
    /// # Errors
    ///
    /// Returns error if the cache cannot be written.
    pub async fn cache_products(&self, products: &[Product]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.write(PRODUCTS_KEY, &products).await
    }

    // ---------------------------------------------------------------------
    // Carts
    // ---------------------------------------------------------------------

    /// Cart for a session, if one was saved.
    ///
    /// # Errors
    ///
    /// Returns error if the carts key cannot be read.
    pub async fn cart(&self, session_id: &str) -> Result<Option<Cart>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut carts: BTreeMap<String, Cart> = self.read(CARTS_KEY).await?.unwrap_or_default();
        Ok(carts.remove(session_id))
    }

    /// Save a cart; an empty cart is removed instead.
    ///
    /// # Errors
    ///
    /// Returns error if the carts key cannot be read or written.
    pub async fn save_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut carts: BTreeMap<String, Cart> = self.read(CARTS_KEY).await?.unwrap_or_default();
        if cart.is_empty() {
            carts.remove(cart.session_id());
        } else {
            carts.insert(cart.session_id().to_string(), cart.clone());
        }
        self.write(CARTS_KEY, &carts).await
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    /// Saved admin settings, or defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the settings key cannot be read.
    pub async fn settings(&self) -> Result<AdminSettings, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read(SETTINGS_KEY).await?.unwrap_or_default())
    }

    /// Overwrite admin settings.
    ///
    /// # Errors
    ///
    /// Returns error if the settings key cannot be written.
    pub async fn save_settings(&self, settings: &AdminSettings) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.write(SETTINGS_KEY, settings).await
    }
}
