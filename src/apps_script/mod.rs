//! Apps Script web app client.
//!
//! The web app owns every spreadsheet mutation. Reads use `GET ?action=...`,
//! writes `POST {"action": ..., ...}`; both answer with the same envelope:
//! `{"success": bool, "message": "...", "data": ..., "timestamp": "..."}`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::domain::aggregates::{Order, OrderStatus, Product};
use crate::domain::lenient::cell_text;
use crate::sheets::rows;

/// Errors that can occur when calling the Apps Script web app.
#[derive(Debug, Error)]
pub enum AppsScriptError {
    /// HTTP request failed.
    #[error("Apps Script request failed: {0}")]
    Request(String),

    /// Non-success HTTP status (401 usually means the script is not deployed for anonymous access).
    #[error("Apps Script returned HTTP {0}")]
    Status(u16),

    /// Body was not the JSON envelope.
    #[error("Apps Script response error: {0}")]
    Response(String),

    /// The script answered `success: false`.
    #[error("Apps Script rejected the request: {0}")]
    Rejected(String),
}

impl AppsScriptError {
    /// The script reports unknown ids as a rejection with a "non trouvé(e)" message.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected(msg) if msg.to_lowercase().contains("non trouv"))
    }
}

/// Response envelope shared by every action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Envelope {
    fn into_result(self) -> Result<Self, AppsScriptError> {
        if self.success { return Ok(self); }
        Err(AppsScriptError::Rejected(
            self.error.clone().or_else(|| self.message.clone()).unwrap_or_else(|| "Erreur inconnue".to_string()),
        ))
    }

    /// `data` as a list of records; anything else is an empty list.
    fn records(&self) -> Vec<&serde_json::Map<String, Value>> {
        match &self.data {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
            _ => vec![],
        }
    }
}

/// Client for one deployed Apps Script web app.
#[derive(Debug, Clone)]
pub struct AppsScriptClient {
    client: Client,
    url: String,
}

impl AppsScriptClient {
    #[must_use]
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }

    /// Whether the URL points at a `/dev` deployment, which only its owner can call.
    pub fn is_dev_deployment(&self) -> bool { self.url.trim_end_matches('/').ends_with("/dev") }

    /// Run a read action.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the script answers `success: false`.
    #[instrument(skip(self))]
    pub async fn get(&self, action: &str) -> Result<Envelope, AppsScriptError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("action", action)])
            .send()
            .await
            .map_err(|e| AppsScriptError::Request(e.to_string()))?;
        Self::read_envelope(response).await
    }

    /// Run a write action. `fields` are merged next to `action` in the body.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the script answers `success: false`.
    #[instrument(skip(self, fields))]
    pub async fn post(&self, action: &str, fields: Value) -> Result<Envelope, AppsScriptError> {
        let mut body = json!({ "action": action });
        if let (Some(target), Value::Object(extra)) = (body.as_object_mut(), fields) {
            target.extend(extra);
        }
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppsScriptError::Request(e.to_string()))?;
        Self::read_envelope(response).await
    }

    async fn read_envelope(response: reqwest::Response) -> Result<Envelope, AppsScriptError> {
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Apps Script HTTP error");
            return Err(AppsScriptError::Status(status.as_u16()));
        }
        let envelope: Envelope = response.json().await.map_err(|e| AppsScriptError::Response(e.to_string()))?;
        debug!(success = envelope.success, message = ?envelope.message, "Apps Script answered");
        envelope.into_result()
    }

    /// `getProducts`, parsed with the same header rules as the sheet.
    ///
    /// # Errors
    ///
    /// Returns error if the action fails.
    pub async fn products(&self) -> Result<Vec<Product>, AppsScriptError> {
        let envelope = self.get("getProducts").await?;
        Ok(envelope
            .records()
            .into_iter()
            .enumerate()
            .filter_map(|(i, record)| rows::product_from_cells(record.iter().map(|(k, v)| (k.as_str(), cell_text(v))), i + 1))
            .collect())
    }

    /// `getOrders`, newest first as the script returns them.
    ///
    /// # Errors
    ///
    /// Returns error if the action fails.
    pub async fn orders(&self) -> Result<Vec<Order>, AppsScriptError> {
        let envelope = self.get("getOrders").await?;
        Ok(envelope
            .records()
            .into_iter()
            .filter_map(|record| rows::order_from_cells(record.iter().map(|(k, v)| (k.as_str(), cell_text(v)))))
            .collect())
    }

    /// `test` action; returns the script's banner message.
    ///
    /// # Errors
    ///
    /// Returns error if the action fails.
    pub async fn ping(&self) -> Result<String, AppsScriptError> {
        Ok(self.get("test").await?.message.unwrap_or_default())
    }

    /// `addOrder`, in the field layout the script reads.
    ///
    /// # Errors
    ///
    /// Returns error if the action fails.
    pub async fn add_order(&self, order: &Order) -> Result<Envelope, AppsScriptError> {
        let fields = json!({
            "order": {
                "id": order.id,
                "customerName": order.customer_name,
                "customerPhone": order.customer_phone,
                "customerEmail": order.customer_email.clone().unwrap_or_default(),
                "customerAddress": order.customer_address,
                "products": order.products,
                "productsText": rows::format_products_cell(&order.products),
                "total": order.order_total,
                "orderTotal": order.order_total,
                "notes": order.notes,
                "status": order.status,
                "date": order.timestamp,
                "timestamp": order.timestamp,
            }
        });
        self.post("addOrder", fields).await
    }

    /// `updateOrderStatus`.
    ///
    /// # Errors
    ///
    /// Returns error if the action fails or the order id is unknown to the sheet.
    pub async fn update_order_status(&self, order_id: &str, status: &OrderStatus) -> Result<Envelope, AppsScriptError> {
        self.post("updateOrderStatus", json!({ "orderId": order_id, "status": status })).await
    }

    /// `addProduct`.
    ///
    /// # Errors
    ///
    /// Returns error if the action fails.
    pub async fn add_product(&self, product: &Product) -> Result<Envelope, AppsScriptError> {
        self.post("addProduct", json!({ "product": product })).await
    }

    /// `updateProduct`.
    ///
    /// # Errors
    ///
    /// Returns error if the action fails or the product id is unknown to the sheet.
    pub async fn update_product(&self, product: &Product) -> Result<Envelope, AppsScriptError> {
        self.post("updateProduct", json!({ "product": product })).await
    }

    /// `deleteProduct`.
    ///
    /// # Errors
    ///
    /// Returns error if the action fails or the product id is unknown to the sheet.
    pub async fn delete_product(&self, product_id: &str) -> Result<Envelope, AppsScriptError> {
        self.post("deleteProduct", json!({ "productId": product_id })).await
    }

    /// `initialize`: create the product and order tabs with their headers.
    ///
    /// # Errors
    ///
    /// Returns error if the action fails.
    pub async fn initialize(&self) -> Result<Envelope, AppsScriptError> {
        self.post("initialize", json!({})).await
    }
}
