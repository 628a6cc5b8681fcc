//! Application services: the operations the HTTP layer exposes.

pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod orders;

pub use cart::CartService;
pub use catalog::{CatalogService, ConnectionReport, ScriptCheck};
pub use dashboard::{DashboardService, DashboardStats};
pub use orders::{OrderService, PlacedOrder, StatusUpdate};

use serde::Serialize;

use crate::resolver::{Attempt, ResolveError, Resolution};

/// A resolved list. An exhausted chain is an empty listing with no source,
/// and the attempts say why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub source: Option<&'static str>,
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<Attempt>,
}

impl<T> Listing<T> {
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    #[must_use]
    pub fn filter(mut self, keep: impl Fn(&T) -> bool) -> Self {
        self.items.retain(|item| keep(item));
        self
    }
}

impl<T> From<Result<Resolution<T>, ResolveError>> for Listing<T> {
    fn from(result: Result<Resolution<T>, ResolveError>) -> Self {
        match result {
            Ok(Resolution { source, items }) => Self { source: Some(source), items, attempts: vec![] },
            Err(ResolveError::Exhausted { attempts, .. }) => Self { source: None, items: vec![], attempts },
        }
    }
}
