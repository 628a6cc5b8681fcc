//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Product, ProductDraft};
pub use order::{LineItem, Order, OrderError, OrderRequest, OrderStatus};
pub use cart::{Cart, CartError, CartItem};
