//! Catalog: product reads through the tier chain, product writes through the
//! Apps Script web app.

use serde::Serialize;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::apps_script::{AppsScriptClient, AppsScriptError};
use crate::domain::aggregates::{Product, ProductDraft};
use crate::domain::validation_message;
use crate::resolver::TieredResolver;
use crate::services::Listing;
use crate::sheets::SheetsClient;
use crate::{OStoreError, Result};

const PRODUCT_NOT_FOUND: &str = "Produit non trouvé";

/// Outcome of `test_connection`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub spreadsheet_title: String,
    pub sheets: Vec<String>,
    /// Expected tabs the spreadsheet does not have yet (see `initialize`).
    pub missing_sheets: Vec<String>,
    pub apps_script: ScriptCheck,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ScriptCheck {
    NotConfigured,
    #[serde(rename_all = "camelCase")]
    Reachable { message: String, dev_deployment: bool },
    Failed { error: String },
}

pub struct CatalogService {
    products: TieredResolver<Product>,
    script: Option<AppsScriptClient>,
    sheets: SheetsClient,
    expected_sheets: Vec<String>,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("products", &self.products)
            .field("apps_script", &self.script.is_some())
            .finish_non_exhaustive()
    }
}

impl CatalogService {
    pub fn new(
        products: TieredResolver<Product>,
        script: Option<AppsScriptClient>,
        sheets: SheetsClient,
        expected_sheets: Vec<String>,
    ) -> Self {
        Self { products, script, sheets, expected_sheets }
    }

    fn script(&self) -> Result<&AppsScriptClient> {
        self.script.as_ref().ok_or(OStoreError::NotConfigured("Google Apps Script"))
    }

    /// Products from the first tier that has any, optionally narrowed to a
    /// category (`all` keeps everything).
    #[instrument(skip(self))]
    pub async fn list_products(&self, category: Option<&str>) -> Listing<Product> {
        let listing = Listing::from(self.products.resolve().await);
        match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(category) => listing.filter(|p| p.in_category(category)),
            None => listing,
        }
    }

    /// Distinct categories in first-seen order.
    pub async fn categories(&self) -> Listing<String> {
        let listing = self.list_products(None).await;
        let mut categories: Vec<String> = Vec::new();
        for product in &listing.items {
            if !categories.iter().any(|c| c.eq_ignore_ascii_case(&product.category)) {
                categories.push(product.category.clone());
            }
        }
        Listing { source: listing.source, items: categories, attempts: listing.attempts }
    }

    pub async fn product(&self, id: &str) -> Result<Product> {
        self.list_products(None)
            .await
            .items
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| OStoreError::NotFound(PRODUCT_NOT_FOUND.to_string()))
    }

    /// Validate a draft and append it to the products sheet.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn add_product(&self, draft: ProductDraft) -> Result<Product> {
        draft.validate().map_err(|e| OStoreError::Validation(validation_message(&e)))?;
        let script = self.script()?;
        let mut product = Product::create(draft);
        script.add_product(&product).await?;
        product.take_events().iter().for_each(|e| e.log());
        Ok(product)
    }

    /// Replace the row of an existing product.
    #[instrument(skip(self, draft))]
    pub async fn update_product(&self, id: &str, draft: ProductDraft) -> Result<Product> {
        draft.validate().map_err(|e| OStoreError::Validation(validation_message(&e)))?;
        let script = self.script()?;
        let product = Product {
            id: id.to_string(),
            name: draft.name.trim().to_string(),
            price: draft.price.into(),
            category: draft.category,
            image: draft.image,
            description: draft.description,
            ..Default::default()
        }
        .with_defaults();
        script.update_product(&product).await.map_err(not_found_as(PRODUCT_NOT_FOUND))?;
        info!(product_id = %id, "product updated");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &str) -> Result<()> {
        self.script()?.delete_product(id).await.map_err(not_found_as(PRODUCT_NOT_FOUND))?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Create the product and order tabs with their header rows.
    pub async fn initialize_sheets(&self) -> Result<String> {
        let envelope = self.script()?.initialize().await?;
        Ok(envelope.message.unwrap_or_else(|| "Feuilles initialisées".to_string()))
    }

    /// Check that the spreadsheet is readable with the configured key and that
    /// the web app answers.
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> Result<ConnectionReport> {
        let info = self.sheets.spreadsheet().await?;
        let sheets = info.sheet_titles();
        let missing_sheets = self.expected_sheets.iter().filter(|s| !sheets.contains(s)).cloned().collect();

        let apps_script = match &self.script {
            None => ScriptCheck::NotConfigured,
            Some(script) => match script.ping().await {
                Ok(message) => ScriptCheck::Reachable { message, dev_deployment: script.is_dev_deployment() },
                Err(e) => {
                    warn!(error = %e, "Apps Script check failed");
                    ScriptCheck::Failed { error: e.to_string() }
                }
            },
        };

        Ok(ConnectionReport { spreadsheet_title: info.properties.title, sheets, missing_sheets, apps_script })
    }
}

fn not_found_as(message: &'static str) -> impl Fn(AppsScriptError) -> OStoreError {
    move |e| if e.is_not_found() { OStoreError::NotFound(message.to_string()) } else { e.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetsConfig;
    use crate::resolver::tiers::{AppsScriptProducts, DemoProducts};
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sheets(server: &MockServer) -> SheetsClient {
        let config = SheetsConfig {
            spreadsheet_id: "sheet-1".into(),
            api_key: SecretString::from("key"),
            api_base: server.uri(),
            products_sheet: "SHEETS_PRODUCTS".into(),
            orders_sheet: "SHEETS_ORDERS".into(),
        };
        SheetsClient::new(reqwest::Client::new(), &config)
    }

    fn service(server: &MockServer, with_script: bool) -> CatalogService {
        let script = with_script.then(|| AppsScriptClient::new(reqwest::Client::new(), format!("{}/exec", server.uri())));
        let mut products = TieredResolver::new("products");
        if let Some(script) = &script {
            products = products.with_tier(AppsScriptProducts(script.clone()));
        }
        CatalogService::new(
            products.with_tier(DemoProducts),
            script,
            sheets(server),
            vec!["SHEETS_PRODUCTS".into(), "SHEETS_ORDERS".into()],
        )
    }

    #[tokio::test]
    async fn test_category_filter_and_categories() {
        let server = MockServer::start().await;
        let catalog = service(&server, false);

        let perfumes = catalog.list_products(Some("parfum")).await;
        assert_eq!(perfumes.source, Some("demo"));
        assert_eq!(perfumes.items.len(), 2);
        assert_eq!(catalog.list_products(Some("all")).await.items.len(), 6);

        let categories = catalog.categories().await.items;
        assert_eq!(categories, vec!["Parfum", "Maquillage", "Soins"]);
    }

    #[tokio::test]
    async fn test_product_lookup() {
        let server = MockServer::start().await;
        let catalog = service(&server, false);
        assert_eq!(catalog.product("3").await.unwrap().name, "Crème Hydratante Visage");
        assert!(matches!(catalog.product("99").await, Err(OStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_writes_need_the_web_app() {
        let server = MockServer::start().await;
        let catalog = service(&server, false);
        let draft = ProductDraft { name: "Parfum".into(), price: "4500".into(), ..Default::default() };
        assert!(matches!(catalog.add_product(draft).await, Err(OStoreError::NotConfigured(_))));
        assert!(matches!(catalog.delete_product("1").await, Err(OStoreError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_add_product_validates_then_posts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"action": "addProduct", "product": {"name": "Parfum", "category": "Général"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "Produit ajouté"})))
            .expect(1)
            .mount(&server)
            .await;
        let catalog = service(&server, true);

        let missing_price = ProductDraft { name: "Parfum".into(), ..Default::default() };
        match catalog.add_product(missing_price).await {
            Err(OStoreError::Validation(msg)) => assert_eq!(msg, "Le prix est obligatoire"),
            other => panic!("expected validation error, got {other:?}"),
        }

        let draft = ProductDraft { name: "Parfum".into(), price: "4500 DA".into(), ..Default::default() };
        let product = catalog.add_product(draft).await.unwrap();
        assert_eq!(product.category, "Général");
    }

    #[tokio::test]
    async fn test_delete_unknown_product_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"action": "deleteProduct", "productId": "42"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false, "error": "Produit non trouvé"})))
            .mount(&server)
            .await;
        let catalog = service(&server, true);
        assert!(matches!(catalog.delete_product("42").await, Err(OStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_connection_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1"))
            .and(query_param("key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"title": "O Store"},
                "sheets": [{"properties": {"title": "SHEETS_PRODUCTS"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/exec"))
            .and(query_param("action", "test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "API fonctionnelle"})))
            .mount(&server)
            .await;

        let report = service(&server, true).test_connection().await.unwrap();
        assert_eq!(report.spreadsheet_title, "O Store");
        assert_eq!(report.missing_sheets, vec!["SHEETS_ORDERS"]);
        assert_eq!(report.apps_script, ScriptCheck::Reachable { message: "API fonctionnelle".into(), dev_deployment: false });
    }
}
