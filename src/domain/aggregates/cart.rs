//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::{LineItem, Product};
use crate::domain::value_objects::{Money, PriceTag, Quantity};

/// Products a shopper has picked before filling in the order form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: String,
    session_id: String,
    items: Vec<CartItem>,
    subtotal: Money,
    currency: String,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub image: String,
    pub quantity: Quantity,
    pub unit_price: PriceTag,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            image: product.image.clone(),
            quantity: Quantity::new(quantity),
            unit_price: product.price.clone(),
        }
    }

    pub fn line_total(&self, currency: &str) -> Money {
        Money::new(self.unit_price.amount(), currency).multiply(self.quantity.value())
    }
}

impl Cart {
    pub fn new(session_id: impl Into<String>, currency: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(), session_id: session_id.into(), items: vec![],
            subtotal: Money::zero(currency), currency: currency.to_string(), updated_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity.is_zero() { return Err(CartError::InvalidQuantity); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = existing.quantity.add(item.quantity.value());
        } else {
            self.items.push(item);
        }
        self.recalculate();
        Ok(())
    }

    /// Set an item's quantity; zero removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.retain(|i| i.product_id != product_id); }
        else { item.quantity = Quantity::new(quantity); }
        self.recalculate();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.recalculate();
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); self.recalculate(); }

    /// Line items for the order form, one per selected product.
    pub fn line_items(&self) -> Vec<LineItem> {
        self.items.iter().map(|i| LineItem {
            id: Some(i.product_id.clone()),
            name: i.name.clone(),
            quantity: i.quantity.value(),
            price: i.unit_price.clone(),
        }).collect()
    }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().fold(Money::zero(&self.currency), |acc, i| acc.add(&i.line_total(&self.currency)).unwrap_or(acc));
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq)] pub enum CartError { ItemNotFound, InvalidQuantity }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Produit absent du panier"),
            Self::InvalidQuantity => write!(f, "Quantité invalide"),
        }
    }
}
