//! Google Sheets REST API client.
//!
//! Read-only: the Sheets API only accepts writes with OAuth credentials, so
//! mutations go through the Apps Script web app instead (see
//! [`crate::apps_script`]).

pub mod rows;

use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::SheetsConfig;
use crate::domain::aggregates::{Order, Product};

/// Errors that can occur when reading from the Sheets API.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// HTTP request failed.
    #[error("Sheets request failed: {0}")]
    Request(String),

    /// Non-success HTTP status.
    #[error("Sheets API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Failed to parse response.
    #[error("Sheets response error: {0}")]
    Response(String),
}

/// `GET .../values/{range}` response body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

/// `GET /v4/spreadsheets/{id}` response body, trimmed to what the connection test reports.
#[derive(Debug, Clone, Deserialize)]
pub struct SpreadsheetInfo {
    #[serde(default)]
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpreadsheetProperties {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetEntry {
    pub properties: SpreadsheetProperties,
}

impl SpreadsheetInfo {
    pub fn sheet_titles(&self) -> Vec<String> { self.sheets.iter().map(|s| s.properties.title.clone()).collect() }
}

/// Google Sheets API client keyed by API key.
#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    api_key: SecretString,
    products_range: String,
    orders_range: String,
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("api_base", &self.api_base)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SheetsClient {
    #[must_use]
    pub fn new(client: Client, config: &SheetsConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            api_key: config.api_key.clone(),
            products_range: config.products_range(),
            orders_range: config.orders_range(),
        }
    }

    /// Read a range of cells.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the API answers with a non-success
    /// status, or the body is not a value range.
    #[instrument(skip(self), fields(spreadsheet = %self.spreadsheet_id))]
    pub async fn values(&self, range: &str) -> Result<ValueRange, SheetsError> {
        let url = self.endpoint(&["values", range])?;
        let body: ValueRange = self.get_json(url).await?;
        debug!(rows = body.values.len(), "Sheets range fetched");
        Ok(body)
    }

    /// Products sheet, parsed. Empty when the sheet has no data rows.
    ///
    /// # Errors
    ///
    /// Returns error if the range cannot be read.
    pub async fn products(&self) -> Result<Vec<Product>, SheetsError> {
        let range = self.values(&self.products_range).await?;
        Ok(rows::parse_products(&rows::to_text_grid(&range.values)))
    }

    /// Orders sheet, parsed, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the range cannot be read.
    pub async fn orders(&self) -> Result<Vec<Order>, SheetsError> {
        let range = self.values(&self.orders_range).await?;
        let mut orders = rows::parse_orders(&rows::to_text_grid(&range.values));
        orders.reverse();
        Ok(orders)
    }

    /// Spreadsheet metadata, used to check that the id and key are valid.
    ///
    /// # Errors
    ///
    /// Returns error if the spreadsheet cannot be read with the configured key.
    #[instrument(skip(self), fields(spreadsheet = %self.spreadsheet_id))]
    pub async fn spreadsheet(&self) -> Result<SpreadsheetInfo, SheetsError> {
        let url = self.endpoint(&[])?;
        self.get_json(url).await
    }

    /// `{api_base}/v4/spreadsheets/{id}/...`, each segment percent-encoded so
    /// sheet names with `#`, `?` or spaces stay inside the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| SheetsError::Request(format!("invalid API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| SheetsError::Request(format!("invalid API base: {}", self.api_base)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, SheetsError> {
        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.expose_secret())])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SheetsError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Status { status: status.as_u16(), body });
        }

        response.json().await.map_err(|e| SheetsError::Response(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SheetsClient {
        let config = SheetsConfig {
            spreadsheet_id: "sheet-1".into(),
            api_key: SecretString::from("k1".to_string()),
            api_base: server.uri(),
            products_sheet: "SHEETS_PRODUCTS".into(),
            orders_sheet: "SHEETS_ORDERS".into(),
        };
        SheetsClient::new(Client::new(), &config)
    }

    #[tokio::test]
    async fn test_products_parsed_from_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/SHEETS_PRODUCTS!A:G"))
            .and(query_param("key", "k1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "SHEETS_PRODUCTS!A1:G3",
                "values": [
                    ["ID", "Name", "Price", "Category", "Image_URL", "Description", "Created"],
                    [1, "Parfum Amber Elixir", 2850, "Parfum", "https://img/1.jpg", "Oriental", "2024-01-01"],
                    ["2", "", "100"]
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let products = client(&server).products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "1");
        assert_eq!(products[0].price.as_str(), "2850");
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let err = client(&server).products().await.unwrap_err();
        assert!(matches!(err, SheetsError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_orders_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/SHEETS_ORDERS!A:I"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [
                    ["ID", "Customer_Name", "Phone", "Email", "Address", "Products", "Total", "Status", "Date"],
                    ["1", "Marie", "0555", "", "Alger", "Parfum (x1)", "4500", "Nouveau", "01/01/2024"],
                    ["2", "Jean", "0666", "", "Oran", "Vernis (x2)", "1700", "Livré", "02/01/2024"]
                ]
            })))
            .mount(&server)
            .await;

        let orders = client(&server).orders().await.unwrap();
        assert_eq!(orders.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), ["2", "1"]);
    }

    #[tokio::test]
    async fn test_range_is_encoded_in_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/Ventes%20%231!A:G"))
            .and(query_param("key", "k1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": [["ID"], ["7"]]})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/Stock%3F!A:B"))
            .and(query_param("key", "k1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": []})))
            .expect(1)
            .mount(&server)
            .await;

        let sheets = client(&server);
        let range = sheets.values("Ventes #1!A:G").await.unwrap();
        assert_eq!(range.values.len(), 2);
        assert!(sheets.values("Stock?!A:B").await.unwrap().values.is_empty());
    }

    #[tokio::test]
    async fn test_api_base_with_path_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/proxy/v4/spreadsheets/sheet-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"properties": {"title": "O Store"}})))
            .expect(1)
            .mount(&server)
            .await;

        let config = SheetsConfig {
            spreadsheet_id: "sheet-1".into(),
            api_key: SecretString::from("k1".to_string()),
            api_base: format!("{}/proxy/", server.uri()),
            products_sheet: "SHEETS_PRODUCTS".into(),
            orders_sheet: "SHEETS_ORDERS".into(),
        };
        let info = SheetsClient::new(Client::new(), &config).spreadsheet().await.unwrap();
        assert_eq!(info.properties.title, "O Store");
    }

    #[tokio::test]
    async fn test_spreadsheet_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"title": "O Store"},
                "sheets": [{"properties": {"title": "SHEETS_PRODUCTS"}}, {"properties": {"title": "SHEETS_ORDERS"}}]
            })))
            .mount(&server)
            .await;

        let info = client(&server).spreadsheet().await.unwrap();
        assert_eq!(info.properties.title, "O Store");
        assert_eq!(info.sheet_titles(), ["SHEETS_PRODUCTS", "SHEETS_ORDERS"]);
    }
}
