//! Product Aggregate

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;
use crate::domain::value_objects::PriceTag;
use crate::domain::events::{DomainEvent, ProductEvent};

pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x300?text=No+Image";
pub const DEFAULT_CATEGORY: &str = "Général";
pub const DEFAULT_DESCRIPTION: &str = "Description non disponible";

/// One row of the products sheet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: PriceTag,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created: String,
    /// Columns the sheet carries beyond the standard ones, keyed by lower-cased header.
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

/// Fields an admin submits to add or edit a product.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
pub struct ProductDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[validate(length(min = 1, message = "Le nom du produit est obligatoire"))]
    pub name: String,
    #[validate(length(min = 1, message = "Le prix est obligatoire"))]
    pub price: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
}

impl Product {
    pub fn create(draft: ProductDraft) -> Self {
        let now = Utc::now();
        let id = draft.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| now.timestamp_millis().to_string());
        let mut product = Self {
            id: id.clone(),
            name: draft.name.trim().to_string(),
            price: PriceTag::new(draft.price),
            category: draft.category,
            image: draft.image,
            description: draft.description,
            created: now.to_rfc3339(),
            extra: BTreeMap::new(),
            events: vec![],
        }.with_defaults();
        let name = product.name.clone();
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id, name }));
        product
    }

    /// Fill blank cells with the storefront defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.price.is_blank() { self.price = PriceTag::new("0"); }
        if self.category.trim().is_empty() { self.category = DEFAULT_CATEGORY.to_string(); }
        if self.description.trim().is_empty() { self.description = DEFAULT_DESCRIPTION.to_string(); }
        if !self.image.starts_with("http") { self.image = PLACEHOLDER_IMAGE.to_string(); }
        self
    }

    pub fn has_name(&self) -> bool { !self.name.trim().is_empty() }

    pub fn in_category(&self, category: &str) -> bool {
        category.eq_ignore_ascii_case("all") || self.category.to_lowercase() == category.to_lowercase()
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn draft(name: &str, price: &str) -> ProductDraft {
        ProductDraft { name: name.into(), price: price.into(), ..Default::default() }
    }

    #[test]
    fn test_product_create_fills_defaults() {
        let mut p = Product::create(draft("  Parfum Eclat  ", "4500 DA"));
        assert_eq!(p.name, "Parfum Eclat");
        assert_eq!(p.category, DEFAULT_CATEGORY);
        assert_eq!(p.image, PLACEHOLDER_IMAGE);
        assert_eq!(p.price.amount(), Decimal::new(4500, 0));
        assert!(!p.id.is_empty());
        assert_eq!(p.take_events().len(), 1);
        assert!(p.take_events().is_empty());
    }

    #[test]
    fn test_product_keeps_supplied_id() {
        let p = Product::create(ProductDraft { id: Some("42".into()), ..draft("Mascara", "380 DA") });
        assert_eq!(p.id, "42");
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft("", "10").validate().is_err());
        assert!(draft("Vernis", "").validate().is_err());
        assert!(draft("Vernis", "850").validate().is_ok());
    }

    #[test]
    fn test_category_filter_is_case_insensitive() {
        let p = Product { category: "Parfum".into(), ..Default::default() };
        assert!(p.in_category("parfum"));
        assert!(p.in_category("all"));
        assert!(!p.in_category("Soins"));
    }

    #[test]
    fn test_extra_columns_flatten() {
        let p = Product {
            id: "1".into(),
            name: "Crème".into(),
            extra: BTreeMap::from([("stock".to_string(), "12".to_string())]),
            ..Default::default()
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["stock"], "12");
        assert_eq!(json["price"], "");
    }
}
