//! Shared application state, built once at startup.

use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use crate::apps_script::AppsScriptClient;
use crate::config::AppConfig;
use crate::domain::aggregates::{Order, Product};
use crate::resolver::tiers::{
    AppsScriptOrders, AppsScriptProducts, CachedProducts, DemoOrders, DemoProducts, LocalOrders, SheetsOrders,
    SheetsProducts,
};
use crate::resolver::{FallbackPolicy, TieredResolver};
use crate::services::{CartService, CatalogService, DashboardService, OrderService};
use crate::sheets::SheetsClient;
use crate::store::LocalStore;
use crate::Result;

#[derive(Clone, Debug)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub carts: Arc<CartService>,
    pub dashboard: Arc<DashboardService>,
    pub store: Arc<LocalStore>,
    pub fallback: FallbackPolicy,
}

impl AppState {
    /// Open the local store and wire the clients, resolvers and services.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or the data directory
    /// cannot be created.
    pub async fn build(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("ostore/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let store = Arc::new(LocalStore::open(&config.data_dir).await?);
        let sheets = SheetsClient::new(client.clone(), &config.sheets);
        let script = config.apps_script_url.as_ref().map(|url| AppsScriptClient::new(client.clone(), url.clone()));

        let products = product_chain(script.as_ref(), &sheets, &store, config.fallback);
        let orders = order_chain(script.as_ref(), &sheets, &store, config.fallback);
        info!(
            products = ?products.tier_names(),
            orders = ?orders.tier_names(),
            fallback = ?config.fallback,
            "resolution chains ready"
        );

        let catalog = Arc::new(CatalogService::new(
            products,
            script.clone(),
            sheets,
            vec![config.sheets.products_sheet.clone(), config.sheets.orders_sheet.clone()],
        ));
        let orders = Arc::new(OrderService::new(orders, script, Arc::clone(&store), config.currency.clone()));
        let carts = Arc::new(CartService::new(Arc::clone(&store), Arc::clone(&catalog), Arc::clone(&orders)));
        let dashboard = Arc::new(DashboardService::new(Arc::clone(&catalog), Arc::clone(&orders)));

        Ok(Self { catalog, orders, carts, dashboard, store, fallback: config.fallback })
    }
}

/// Apps Script, Sheets API, product cache, then demo data under the demo policy.
pub fn product_chain(
    script: Option<&AppsScriptClient>,
    sheets: &SheetsClient,
    store: &Arc<LocalStore>,
    fallback: FallbackPolicy,
) -> TieredResolver<Product> {
    let mut chain = TieredResolver::new("products");
    if let Some(script) = script {
        chain = chain.with_tier(AppsScriptProducts(script.clone()));
    }
    chain = chain.with_tier(SheetsProducts(sheets.clone())).with_tier(CachedProducts(Arc::clone(store)));
    if fallback == FallbackPolicy::Demo {
        chain = chain.with_tier(DemoProducts);
    }
    chain
}

/// Apps Script, Sheets API, local order backup, then demo orders under the demo policy.
pub fn order_chain(
    script: Option<&AppsScriptClient>,
    sheets: &SheetsClient,
    store: &Arc<LocalStore>,
    fallback: FallbackPolicy,
) -> TieredResolver<Order> {
    let mut chain = TieredResolver::new("orders");
    if let Some(script) = script {
        chain = chain.with_tier(AppsScriptOrders(script.clone()));
    }
    chain = chain.with_tier(SheetsOrders(sheets.clone())).with_tier(LocalOrders(Arc::clone(store)));
    if fallback == FallbackPolicy::Demo {
        chain = chain.with_tier(DemoOrders);
    }
    chain
}
