//! Per-session carts.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::aggregates::{Cart, CartItem, OrderRequest};
use crate::services::{CatalogService, OrderService, PlacedOrder};
use crate::store::LocalStore;
use crate::Result;

#[derive(Debug)]
pub struct CartService {
    store: Arc<LocalStore>,
    catalog: Arc<CatalogService>,
    orders: Arc<OrderService>,
}

impl CartService {
    pub fn new(store: Arc<LocalStore>, catalog: Arc<CatalogService>, orders: Arc<OrderService>) -> Self {
        Self { store, catalog, orders }
    }

    /// The session's cart, or a fresh empty one.
    pub async fn cart(&self, session_id: &str) -> Result<Cart> {
        Ok(self.store.cart(session_id).await?.unwrap_or_else(|| Cart::new(session_id, self.orders.currency())))
    }

    #[instrument(skip(self))]
    pub async fn add(&self, session_id: &str, product_id: &str, quantity: u32) -> Result<Cart> {
        let product = self.catalog.product(product_id).await?;
        let mut cart = self.cart(session_id).await?;
        cart.add_item(CartItem::from_product(&product, quantity))?;
        self.store.save_cart(&cart).await?;
        debug!(items = cart.item_count(), "cart updated");
        Ok(cart)
    }

    /// Set a line's quantity; zero removes the line.
    pub async fn set_quantity(&self, session_id: &str, product_id: &str, quantity: u32) -> Result<Cart> {
        let mut cart = self.cart(session_id).await?;
        cart.update_quantity(product_id, quantity)?;
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    pub async fn remove(&self, session_id: &str, product_id: &str) -> Result<Cart> {
        let mut cart = self.cart(session_id).await?;
        cart.remove_item(product_id)?;
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    pub async fn clear(&self, session_id: &str) -> Result<Cart> {
        let mut cart = self.cart(session_id).await?;
        cart.clear();
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Place an order for the cart's contents with the given customer
    /// details, then empty the cart. Products in `details` are ignored.
    #[instrument(skip(self, details))]
    pub async fn checkout(&self, session_id: &str, details: OrderRequest) -> Result<PlacedOrder> {
        let mut cart = self.cart(session_id).await?;
        let request = OrderRequest { products: cart.line_items(), ..details };
        let placed = self.orders.place_order(request).await?;
        cart.clear();
        self.store.save_cart(&cart).await?;
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetsConfig;
    use crate::resolver::tiers::{DemoProducts, LocalOrders};
    use crate::resolver::TieredResolver;
    use crate::sheets::SheetsClient;
    use crate::OStoreError;
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    async fn service() -> (tempfile::TempDir, Arc<LocalStore>, CartService) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path()).await.unwrap());
        let sheets_config = SheetsConfig {
            spreadsheet_id: "unused".into(),
            api_key: SecretString::from("unused"),
            api_base: "http://127.0.0.1:9".into(),
            products_sheet: "SHEETS_PRODUCTS".into(),
            orders_sheet: "SHEETS_ORDERS".into(),
        };
        let catalog = Arc::new(CatalogService::new(
            TieredResolver::new("products").with_tier(DemoProducts),
            None,
            SheetsClient::new(reqwest::Client::new(), &sheets_config),
            vec![],
        ));
        let orders = Arc::new(OrderService::new(
            TieredResolver::new("orders").with_tier(LocalOrders(Arc::clone(&store))),
            None,
            Arc::clone(&store),
            "DA",
        ));
        (dir, Arc::clone(&store), CartService::new(store, catalog, orders))
    }

    fn details() -> OrderRequest {
        OrderRequest {
            customer_name: "Jean Martin".into(),
            customer_phone: "0987654321".into(),
            customer_address: "Oran".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_merges_and_persists_per_session() {
        let (_dir, _store, carts) = service().await;
        carts.add("s1", "1", 1).await.unwrap();
        let cart = carts.add("s1", "1", 2).await.unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 3);
        assert_eq!(cart.subtotal().amount(), Decimal::new(2550, 0));

        assert!(carts.cart("s2").await.unwrap().is_empty());
        assert_eq!(carts.cart("s1").await.unwrap(), cart);
    }

    #[tokio::test]
    async fn test_unknown_product_and_line() {
        let (_dir, _store, carts) = service().await;
        assert!(matches!(carts.add("s1", "999", 1).await, Err(OStoreError::NotFound(_))));
        assert!(matches!(carts.add("s1", "1", 0).await, Err(OStoreError::Validation(_))));
        assert!(matches!(carts.remove("s1", "1").await, Err(OStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_quantity_zero_removes_line() {
        let (_dir, _store, carts) = service().await;
        carts.add("s1", "1", 1).await.unwrap();
        carts.add("s1", "2", 1).await.unwrap();
        let cart = carts.set_quantity("s1", "1", 0).await.unwrap();
        assert_eq!(cart.items()[0].product_id, "2");
        assert!(carts.clear("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_places_order_and_empties_cart() {
        let (_dir, store, carts) = service().await;
        carts.add("s1", "2", 2).await.unwrap();
        let placed = carts.checkout("s1", details()).await.unwrap();
        assert_eq!(placed.order.order_total, "840.00");
        assert_eq!(placed.order.products[0].id.as_deref(), Some("2"));
        assert!(carts.cart("s1").await.unwrap().is_empty());
        assert_eq!(store.orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_of_empty_cart_fails() {
        let (_dir, _store, carts) = service().await;
        assert!(matches!(carts.checkout("s1", details()).await, Err(OStoreError::Validation(_))));
    }
}
