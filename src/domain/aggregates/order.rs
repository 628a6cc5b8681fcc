//! Order Aggregate

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;
use crate::domain::{lenient, validation_message};
use crate::domain::value_objects::{parse_price, Money, PriceTag};
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_address: String,
    #[serde(default)]
    pub products: Vec<LineItem>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub order_total: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, alias = "date")]
    pub timestamp: String,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::optional_string")]
    pub id: Option<String>,
    pub name: String,
    #[serde(deserialize_with = "lenient::quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient::string")]
    pub price: PriceTag,
}

impl LineItem {
    pub fn line_total(&self, currency: &str) -> Money { Money::new(self.price.amount(), currency).multiply(self.quantity) }
}

/// Free-text order status. The four known labels round-trip exactly; anything
/// else a sheet editor typed is kept verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    New,
    InProgress,
    Shipped,
    Delivered,
    Other(String),
}

impl OrderStatus {
    pub fn label(&self) -> &str {
        match self {
            Self::New => "Nouveau",
            Self::InProgress => "En cours",
            Self::Shipped => "Expédié",
            Self::Delivered => "Livré",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.trim() {
            "" | "Nouveau" => Self::New,
            "En cours" => Self::InProgress,
            "Expédié" => Self::Shipped,
            "Livré" => Self::Delivered,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self { Self::from(value.to_string()) }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self { value.label().to_string() }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

/// Customer details and selected products submitted by the order form.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[validate(length(min = 1, message = "Le nom est obligatoire"))]
    pub customer_name: String,
    #[validate(length(min = 1, message = "Le téléphone est obligatoire"))]
    pub customer_phone: String,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    #[validate(email(message = "Adresse email invalide"))]
    pub customer_email: Option<String>,
    #[validate(length(min = 1, message = "L'adresse est obligatoire"))]
    pub customer_address: String,
    #[serde(default)]
    pub products: Vec<LineItem>,
    #[serde(default)]
    pub notes: String,
}

impl OrderRequest {
    /// Trim the customer fields; a blank email counts as no email.
    pub fn normalize(&mut self) {
        for field in [&mut self.customer_name, &mut self.customer_phone, &mut self.customer_address] {
            *field = field.trim().to_string();
        }
        self.customer_email = self
            .customer_email
            .take()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
    }
}

impl Order {
    /// Validate a request and turn it into a new order with a computed total.
    pub fn place(mut request: OrderRequest, currency: &str) -> Result<Self, OrderError> {
        request.normalize();
        request.validate().map_err(|e| OrderError::Invalid(validation_message(&e)))?;
        if request.products.is_empty() { return Err(OrderError::NoItems); }
        if let Some(item) = request.products.iter().find(|i| i.quantity == 0) {
            return Err(OrderError::InvalidQuantity(item.name.clone()));
        }

        let now = Utc::now();
        let mut order = Self {
            id: now.timestamp_millis().to_string(),
            customer_name: request.customer_name,
            customer_phone: request.customer_phone,
            customer_email: request.customer_email,
            customer_address: request.customer_address,
            products: request.products,
            order_total: String::new(),
            notes: request.notes,
            status: OrderStatus::New,
            timestamp: now.to_rfc3339(),
            events: vec![],
        };
        let total = order.total(currency);
        order.order_total = total.to_fixed();
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id.clone(),
            customer_name: order.customer_name.clone(),
            total: total.amount(),
        }));
        Ok(order)
    }

    /// Sum of unit price times quantity over every line item.
    pub fn total(&self, currency: &str) -> Money {
        self.products.iter().fold(Money::zero(currency), |acc, i| acc.add(&i.line_total(currency)).unwrap_or(acc))
    }

    /// Amount recorded in `orderTotal`, parsed the same way as product prices.
    pub fn recorded_total(&self) -> Decimal { parse_price(&self.order_total) }

    pub fn set_status(&mut self, status: OrderStatus) {
        if self.status == status { return; }
        let from = std::mem::replace(&mut self.status, status);
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged {
            order_id: self.id.clone(),
            from: from.label().to_string(),
            to: self.status.label().to_string(),
        }));
    }

    /// Creation time, accepting RFC 3339 as well as the `fr-FR` locale strings
    /// the spreadsheet scripts write.
    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) { return Some(ts.with_timezone(&Utc)); }
        for fmt in ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y, %H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) { return Some(ts.and_utc()); }
        }
        for fmt in ["%d/%m/%Y", "%Y-%m-%d"] {
            if let Ok(day) = NaiveDate::parse_from_str(raw, fmt) { return day.and_hms_opt(0, 0, 0).map(|d| d.and_utc()); }
        }
        self.id.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq)] pub enum OrderError { Invalid(String), NoItems, InvalidQuantity(String) }
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "{msg}"),
            Self::NoItems => write!(f, "Veuillez sélectionner au moins un produit avant de passer commande."),
            Self::InvalidQuantity(name) => write!(f, "Quantité invalide pour {name}"),
        }
    }
}
