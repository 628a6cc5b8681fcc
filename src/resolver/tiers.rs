//! Concrete tiers for products and orders.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::warn;

use super::{Tier, TierError};
use crate::apps_script::AppsScriptClient;
use crate::domain::aggregates::{LineItem, Order, OrderStatus, Product};
use crate::sheets::SheetsClient;
use crate::store::LocalStore;

/// Tier 1: the Apps Script web app's `getProducts`.
#[derive(Debug, Clone)]
pub struct AppsScriptProducts(pub AppsScriptClient);

#[async_trait]
impl Tier<Product> for AppsScriptProducts {
    fn name(&self) -> &'static str { "apps_script" }
    async fn fetch(&self) -> Result<Vec<Product>, TierError> { self.0.products().await.map_err(TierError::new) }
    fn is_remote(&self) -> bool { true }
}

/// Tier 1: the Apps Script web app's `getOrders`.
#[derive(Debug, Clone)]
pub struct AppsScriptOrders(pub AppsScriptClient);

#[async_trait]
impl Tier<Order> for AppsScriptOrders {
    fn name(&self) -> &'static str { "apps_script" }
    async fn fetch(&self) -> Result<Vec<Order>, TierError> { self.0.orders().await.map_err(TierError::new) }
    fn is_remote(&self) -> bool { true }
}

/// Tier 2: products read straight from the Sheets API.
#[derive(Debug, Clone)]
pub struct SheetsProducts(pub SheetsClient);

#[async_trait]
impl Tier<Product> for SheetsProducts {
    fn name(&self) -> &'static str { "sheets_api" }
    async fn fetch(&self) -> Result<Vec<Product>, TierError> { self.0.products().await.map_err(TierError::new) }
    fn is_remote(&self) -> bool { true }
}

/// Tier 2: orders read straight from the Sheets API.
#[derive(Debug, Clone)]
pub struct SheetsOrders(pub SheetsClient);

#[async_trait]
impl Tier<Order> for SheetsOrders {
    fn name(&self) -> &'static str { "sheets_api" }
    async fn fetch(&self) -> Result<Vec<Order>, TierError> { self.0.orders().await.map_err(TierError::new) }
    fn is_remote(&self) -> bool { true }
}

/// Tier 3: the last product list a remote tier served.
#[derive(Debug, Clone)]
pub struct CachedProducts(pub Arc<LocalStore>);

#[async_trait]
impl Tier<Product> for CachedProducts {
    fn name(&self) -> &'static str { "local_cache" }

    async fn fetch(&self) -> Result<Vec<Product>, TierError> { self.0.cached_products().await.map_err(TierError::new) }

    async fn remember(&self, items: &[Product]) {
        if let Err(e) = self.0.cache_products(items).await {
            warn!(error = %e, "could not refresh product cache");
        }
    }
}

/// Tier 3: orders submitted through this service, newest first.
///
/// Remote order lists are not written back here: this key is the backup of
/// locally placed orders, not a mirror of the sheet.
#[derive(Debug, Clone)]
pub struct LocalOrders(pub Arc<LocalStore>);

#[async_trait]
impl Tier<Order> for LocalOrders {
    fn name(&self) -> &'static str { "local_store" }

    async fn fetch(&self) -> Result<Vec<Order>, TierError> {
        let mut orders = self.0.orders().await.map_err(TierError::new)?;
        orders.reverse();
        Ok(orders)
    }
}

/// Tier 4, demo policy only: a fixed catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoProducts;

#[async_trait]
impl Tier<Product> for DemoProducts {
    fn name(&self) -> &'static str { "demo" }
    async fn fetch(&self) -> Result<Vec<Product>, TierError> { Ok(demo_products()) }
}

/// Tier 4, demo policy only: two sample orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoOrders;

#[async_trait]
impl Tier<Order> for DemoOrders {
    fn name(&self) -> &'static str { "demo" }
    async fn fetch(&self) -> Result<Vec<Order>, TierError> { Ok(demo_orders()) }
}

pub fn demo_products() -> Vec<Product> {
    const IMG: &str = "https://images.unsplash.com/photo-";
    [
        ("1", "Parfum Oriflame Eclat", "850 DA", "Parfum", "1563170351-be82bc888aa4", "Parfum élégant aux notes florales"),
        ("2", "Rouge à Lèvres Velours", "420 DA", "Maquillage", "1586495777744-4413f21062fa", "Rouge à lèvres longue tenue"),
        ("3", "Crème Hydratante Visage", "650 DA", "Soins", "1570194065650-d99fb4bedf0a", "Crème hydratante pour tous types de peau"),
        ("4", "Mascara Volume", "380 DA", "Maquillage", "1631214540242-3a7976a8c7e0", "Mascara pour un volume intense"),
        ("5", "Eau de Toilette Fresh", "720 DA", "Parfum", "1541643600914-78b084683601", "Eau de toilette fraîche et légère"),
        ("6", "Fond de Teint Natural", "590 DA", "Maquillage", "1596462502278-27bfdc403348", "Fond de teint effet naturel"),
    ]
    .into_iter()
    .map(|(id, name, price, category, photo, description)| Product {
        id: id.to_string(),
        name: name.to_string(),
        price: price.into(),
        category: category.to_string(),
        image: format!("{IMG}{photo}?auto=format&fit=crop&w=400&q=80"),
        description: description.to_string(),
        ..Default::default()
    })
    .collect()
}

pub fn demo_orders() -> Vec<Order> {
    let now = Utc::now();
    let yesterday = now - Duration::days(1);
    vec![
        Order {
            id: now.timestamp_millis().to_string(),
            customer_name: "Marie Dubois".into(),
            customer_phone: "0123456789".into(),
            products: vec![LineItem { id: Some("1".into()), name: "Parfum Oriflame Eclat".into(), quantity: 1, price: "850 DA".into() }],
            order_total: "850.00".into(),
            notes: "Livraison rapide souhaitée".into(),
            status: OrderStatus::New,
            timestamp: now.to_rfc3339(),
            ..Default::default()
        },
        Order {
            id: yesterday.timestamp_millis().to_string(),
            customer_name: "Jean Martin".into(),
            customer_phone: "0987654321".into(),
            products: vec![LineItem { id: Some("2".into()), name: "Rouge à Lèvres Velours".into(), quantity: 2, price: "420 DA".into() }],
            order_total: "840.00".into(),
            status: OrderStatus::InProgress,
            timestamp: yesterday.to_rfc3339(),
            ..Default::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::TieredResolver;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_remote_products_are_cached_then_served_offline() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path()).await.unwrap());
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [{"id": "1", "name": "Parfum", "price": "4500 DA"}]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let script = AppsScriptClient::new(reqwest::Client::new(), server.uri());
        let resolver = TieredResolver::new("products")
            .with_tier(AppsScriptProducts(script))
            .with_tier(CachedProducts(Arc::clone(&store)));

        let first = resolver.resolve().await.unwrap();
        assert_eq!(first.source, "apps_script");
        let second = resolver.resolve().await.unwrap();
        assert_eq!(second.source, "local_cache");
        assert_eq!(second.items, first.items);
    }

    #[tokio::test]
    async fn test_local_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path()).await.unwrap());
        store.append_order(Order { id: "1".into(), customer_name: "A".into(), ..Default::default() }).await.unwrap();
        store.append_order(Order { id: "2".into(), customer_name: "B".into(), ..Default::default() }).await.unwrap();
        let orders = LocalOrders(store).fetch().await.unwrap();
        assert_eq!(orders[0].id, "2");
    }

    #[test]
    fn test_demo_data_is_well_formed() {
        let products = demo_products();
        assert_eq!(products.len(), 6);
        assert!(products.iter().all(|p| p.image.starts_with("https://") && p.price.amount() > rust_decimal::Decimal::ZERO));
        let orders = demo_orders();
        assert!(orders.iter().all(|o| o.total("DA").to_fixed() == o.order_total));
    }
}
