//! HTTP API.
//!
//! Every body is the envelope the storefront pages already understand:
//! `{"success": bool, "message"?: "...", "error"?: "...", "data"?: ...}`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::domain::aggregates::{OrderRequest, OrderStatus, ProductDraft};
use crate::services::Listing;
use crate::state::AppState;
use crate::store::AdminSettings;
use crate::{OStoreError, Result};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Tier that served a list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self { Self { success: true, message: None, error: None, data: Some(data), source: None } }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// A list, with `empty_message` when nothing was found anywhere.
    fn listing(listing: Listing<T>, empty_message: &str) -> Self {
        let message = listing.is_empty().then(|| empty_message.to_string());
        Self { success: true, message, error: None, data: Some(listing.items), source: listing.source }
    }
}

impl ApiResponse<()> {
    fn failure(message: String) -> Self { Self { success: false, message: None, error: Some(message), data: None, source: None } }
}

impl IntoResponse for OStoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotConfigured(_) | Self::Resolve(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Sheets(_) | Self::AppsScript(_) | Self::Client(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Upstream and storage details stay in the logs
        let message = match &self {
            Self::Validation(_) | Self::NotFound(_) | Self::NotConfigured(_) => self.to_string(),
            Self::Sheets(_) | Self::AppsScript(_) | Self::Client(_) => {
                error!(error = %self, "upstream request failed");
                "Erreur de communication avec Google Sheets".to_string()
            }
            Self::Resolve(_) => "Aucune source de données disponible".to_string(),
            Self::Store(_) | Self::Config(_) => {
                error!(error = %self, "internal error");
                "Erreur interne du serveur".to_string()
            }
        };

        (status, Json(ApiResponse::failure(message))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(list_products).post(create_product))
        .route("/api/v1/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/api/v1/categories", get(list_categories))
        .route("/api/v1/orders", get(list_orders).post(place_order).delete(clear_orders))
        .route("/api/v1/orders/:id/status", put(update_order_status))
        .route("/api/v1/cart/:session", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items/:product_id", put(set_cart_quantity).delete(remove_from_cart))
        .route("/api/v1/cart/:session/checkout", post(checkout))
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/connection", get(test_connection))
        .route("/api/v1/sheets/initialize", post(initialize_sheets))
        .route("/api/v1/settings", get(get_settings).put(save_settings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(s): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy", "service": "ostore", "fallback": s.fallback}))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProductParams {
    pub category: Option<String>,
}

async fn list_products(State(s): State<AppState>, Query(p): Query<ProductParams>) -> impl IntoResponse {
    let listing = s.catalog.list_products(p.category.as_deref()).await;
    Json(ApiResponse::listing(listing, "Aucun produit disponible pour le moment"))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(s.catalog.product(&id).await?)))
}

async fn create_product(State(s): State<AppState>, Json(draft): Json<ProductDraft>) -> Result<impl IntoResponse> {
    let product = s.catalog.add_product(draft).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(product).with_message("Produit ajouté avec succès"))))
}

async fn update_product(
    State(s): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse> {
    let product = s.catalog.update_product(&id, draft).await?;
    Ok(Json(ApiResponse::ok(product).with_message("Produit mis à jour avec succès")))
}

async fn delete_product(State(s): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse> {
    s.catalog.delete_product(&id).await?;
    Ok(Json(ApiResponse::ok(id).with_message("Produit supprimé avec succès")))
}

async fn list_categories(State(s): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::listing(s.catalog.categories().await, "Aucune catégorie disponible"))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OrderParams {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

async fn list_orders(State(s): State<AppState>, Query(p): Query<OrderParams>) -> impl IntoResponse {
    let listing = s.orders.list_orders(p.status.as_deref()).await;
    Json(ApiResponse::listing(listing, "Aucune commande pour le moment"))
}

async fn place_order(State(s): State<AppState>, Json(request): Json<OrderRequest>) -> Result<impl IntoResponse> {
    let placed = s.orders.place_order(request).await?;
    let message = placed.message.clone();
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(placed).with_message(message))))
}

async fn update_order_status(
    State(s): State<AppState>,
    Path(id): Path<String>,
    Json(r): Json<StatusRequest>,
) -> Result<impl IntoResponse> {
    if r.status.trim().is_empty() {
        return Err(OStoreError::Validation("Le statut est obligatoire".to_string()));
    }
    let update = s.orders.update_status(&id, OrderStatus::from(r.status)).await?;
    Ok(Json(ApiResponse::ok(update).with_message("Statut mis à jour avec succès")))
}

async fn clear_orders(State(s): State<AppState>) -> Result<impl IntoResponse> {
    s.orders.clear_local_orders().await?;
    Ok(Json(ApiResponse::ok(()).with_message("Commandes locales supprimées")))
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 { 1 }

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(s.carts.cart(&session).await?)))
}

async fn add_to_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<AddToCartRequest>,
) -> Result<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(s.carts.add(&session, &r.product_id, r.quantity).await?)))
}

async fn set_cart_quantity(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, String)>,
    Json(r): Json<QuantityRequest>,
) -> Result<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(s.carts.set_quantity(&session, &product_id, r.quantity).await?)))
}

async fn remove_from_cart(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(s.carts.remove(&session, &product_id).await?)))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(s.carts.clear(&session).await?)))
}

async fn checkout(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(details): Json<OrderRequest>,
) -> Result<impl IntoResponse> {
    let placed = s.carts.checkout(&session, details).await?;
    let message = placed.message.clone();
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(placed).with_message(message))))
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

async fn dashboard(State(s): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(s.dashboard.stats().await))
}

async fn test_connection(State(s): State<AppState>) -> Result<impl IntoResponse> {
    let report = s.catalog.test_connection().await?;
    let message = format!("Connexion réussie: {}", report.spreadsheet_title);
    Ok(Json(ApiResponse::ok(report).with_message(message)))
}

async fn initialize_sheets(State(s): State<AppState>) -> Result<impl IntoResponse> {
    let message = s.catalog.initialize_sheets().await?;
    Ok(Json(ApiResponse::ok(()).with_message(message)))
}

async fn get_settings(State(s): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(s.store.settings().await?)))
}

async fn save_settings(State(s): State<AppState>, Json(settings): Json<AdminSettings>) -> Result<impl IntoResponse> {
    s.store.save_settings(&settings).await?;
    Ok(Json(ApiResponse::ok(settings).with_message("Paramètres sauvegardés")))
}
