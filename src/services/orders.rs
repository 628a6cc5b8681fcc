//! Order placement, listing and status changes.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::apps_script::{AppsScriptClient, AppsScriptError};
use crate::domain::aggregates::{Order, OrderRequest, OrderStatus};
use crate::resolver::TieredResolver;
use crate::services::Listing;
use crate::store::LocalStore;
use crate::{OStoreError, Result};

const ORDER_NOT_FOUND: &str = "Commande non trouvée";

/// A stored order and where it landed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order: Order,
    /// The web app accepted the row.
    pub saved_to_sheet: bool,
    /// The local backup holds it.
    pub saved_locally: bool,
    pub message: String,
}

/// Result of a status change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub order_id: String,
    pub status: OrderStatus,
    pub sheet_updated: bool,
    pub local_updated: bool,
}

pub struct OrderService {
    orders: TieredResolver<Order>,
    script: Option<AppsScriptClient>,
    store: Arc<LocalStore>,
    currency: String,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("orders", &self.orders)
            .field("apps_script", &self.script.is_some())
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

impl OrderService {
    pub fn new(
        orders: TieredResolver<Order>,
        script: Option<AppsScriptClient>,
        store: Arc<LocalStore>,
        currency: impl Into<String>,
    ) -> Self {
        Self { orders, script, store, currency: currency.into() }
    }

    pub fn currency(&self) -> &str { &self.currency }

    /// Validate and record a new order.
    ///
    /// The local backup is written first so its id is final, then the row is
    /// sent to the web app. Either destination is enough; the call fails only
    /// when both do.
    #[instrument(skip(self, request), fields(customer = %request.customer_name))]
    pub async fn place_order(&self, request: OrderRequest) -> Result<PlacedOrder> {
        let mut order = Order::place(request, &self.currency)?;
        let events = order.take_events();

        let local_error = match self.store.append_order(order.clone()).await {
            Ok(stored) => {
                order = stored;
                None
            }
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "local order backup failed");
                Some(e)
            }
        };

        let remote_error = match &self.script {
            None => Some(OStoreError::NotConfigured("Google Apps Script")),
            Some(script) => match script.add_order(&order).await {
                Ok(_) => None,
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "sheet submission failed, order kept locally");
                    Some(e.into())
                }
            },
        };

        let (saved_locally, saved_to_sheet) = (local_error.is_none(), remote_error.is_none());
        if let (Some(local), Some(remote)) = (local_error, remote_error) {
            warn!(remote = %remote, "order could not be recorded anywhere");
            return Err(local.into());
        }

        events.iter().for_each(|e| e.log());
        let message = if saved_to_sheet {
            "Commande enregistrée avec succès"
        } else {
            "Commande enregistrée localement, elle sera transmise ultérieurement"
        };
        Ok(PlacedOrder { order, saved_to_sheet, saved_locally, message: message.to_string() })
    }

    /// Orders newest first, optionally narrowed to one status label.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, status: Option<&str>) -> Listing<Order> {
        let listing = Listing::from(self.orders.resolve().await);
        match status.map(str::trim).filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all")) {
            Some(label) => {
                let wanted = OrderStatus::from(label);
                listing.filter(|o| o.status == wanted)
            }
            None => listing,
        }
    }

    /// Change an order's status in the sheet and in the local backup.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> Result<StatusUpdate> {
        let mut remote_error: Option<AppsScriptError> = None;
        let sheet_updated = match &self.script {
            None => false,
            Some(script) => match script.update_order_status(id, &status).await {
                Ok(_) => true,
                Err(e) if e.is_not_found() => false,
                Err(e) => {
                    warn!(order_id = %id, error = %e, "sheet status update failed");
                    remote_error = Some(e);
                    false
                }
            },
        };

        let local = self.store.update_order_status(id, status.clone()).await?;
        let local_updated = match local {
            Some(mut order) => {
                order.take_events().iter().for_each(|e| e.log());
                true
            }
            None => false,
        };

        if !sheet_updated && !local_updated {
            return Err(remote_error.map_or_else(|| OStoreError::NotFound(ORDER_NOT_FOUND.to_string()), Into::into));
        }
        if sheet_updated && !local_updated {
            info!(order_id = %id, status = %status, "order status changed");
        }
        Ok(StatusUpdate { order_id: id.to_string(), status, sheet_updated, local_updated })
    }

    /// Drop the local order backup. The spreadsheet is untouched.
    pub async fn clear_local_orders(&self) -> Result<()> {
        self.store.clear_orders().await?;
        info!("local order backup cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::LineItem;
    use crate::resolver::tiers::LocalOrders;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> OrderRequest {
        OrderRequest {
            customer_name: "Marie Dubois".into(),
            customer_phone: "0123456789".into(),
            customer_address: "12 rue des Lilas, Alger".into(),
            products: vec![
                LineItem { id: Some("1".into()), name: "Parfum".into(), quantity: 2, price: "4500 DA".into() },
                LineItem { id: Some("2".into()), name: "Crème".into(), quantity: 3, price: "850.50 DA".into() },
            ],
            ..Default::default()
        }
    }

    async fn service(script_url: Option<String>) -> (tempfile::TempDir, Arc<LocalStore>, OrderService) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path()).await.unwrap());
        let script = script_url.map(|url| AppsScriptClient::new(reqwest::Client::new(), url));
        let resolver = TieredResolver::new("orders").with_tier(LocalOrders(Arc::clone(&store)));
        let service = OrderService::new(resolver, script, Arc::clone(&store), "DA");
        (dir, store, service)
    }

    #[tokio::test]
    async fn test_place_order_without_web_app_is_kept_locally() {
        let (_dir, store, service) = service(None).await;
        let placed = service.place_order(request()).await.unwrap();
        assert!(!placed.saved_to_sheet);
        assert!(placed.saved_locally);
        assert_eq!(placed.order.order_total, "11551.50");
        assert_eq!(store.orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_place_order_reports_sheet_acceptance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"action": "addOrder", "order": {"customerName": "Marie Dubois", "total": "11551.50"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        let (_dir, _store, service) = service(Some(server.uri())).await;
        let placed = service.place_order(request()).await.unwrap();
        assert!(placed.saved_to_sheet);
        assert_eq!(placed.message, "Commande enregistrée avec succès");
    }

    #[tokio::test]
    async fn test_sheet_failure_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(500)).mount(&server).await;
        let (_dir, store, service) = service(Some(server.uri())).await;
        let placed = service.place_order(request()).await.unwrap();
        assert!(!placed.saved_to_sheet);
        assert_eq!(store.orders().await.unwrap()[0].id, placed.order.id);
    }

    #[tokio::test]
    async fn test_invalid_order_is_rejected_before_any_write() {
        let (_dir, store, service) = service(None).await;
        let mut bad = request();
        bad.products.clear();
        assert!(matches!(service.place_order(bad).await, Err(OStoreError::Validation(_))));
        assert!(store.orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_orders_all_land() {
        let (_dir, store, service) = service(None).await;
        let service = Arc::new(service);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.place_order(request()).await.unwrap() })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        let orders = store.orders().await.unwrap();
        assert_eq!(orders.len(), 8);
        let mut ids: Vec<_> = orders.iter().map(|o| o.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[tokio::test]
    async fn test_list_orders_by_status() {
        let (_dir, _store, service) = service(None).await;
        let placed = service.place_order(request()).await.unwrap();
        service.update_status(&placed.order.id, OrderStatus::Shipped).await.unwrap();

        assert_eq!(service.list_orders(Some("Expédié")).await.items.len(), 1);
        assert!(service.list_orders(Some("Nouveau")).await.is_empty());
        assert_eq!(service.list_orders(None).await.source, Some("local_store"));
    }

    #[tokio::test]
    async fn test_update_status_unknown_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Commande non trouvée"})))
            .mount(&server)
            .await;
        let (_dir, _store, service) = service(Some(server.uri())).await;
        assert!(matches!(service.update_status("404", OrderStatus::Delivered).await, Err(OStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_status_sheet_only_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"action": "updateOrderStatus", "orderId": "77", "status": "Livré"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;
        let (_dir, _store, service) = service(Some(server.uri())).await;
        let update = service.update_status("77", OrderStatus::Delivered).await.unwrap();
        assert!(update.sheet_updated);
        assert!(!update.local_updated);
    }

    #[tokio::test]
    async fn test_clear_local_orders() {
        let (_dir, store, service) = service(None).await;
        service.place_order(request()).await.unwrap();
        service.clear_local_orders().await.unwrap();
        assert!(store.orders().await.unwrap().is_empty());
        assert_eq!(service.list_orders(None).await.source, None);
    }
}
