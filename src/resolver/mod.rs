//! Tiered data resolution.
//!
//! A resource (products, orders) is loaded by asking a fixed list of sources
//! in priority order and taking the first non-empty answer. A failing or
//! empty tier is logged and skipped; there is one attempt per tier per call.

pub mod tiers;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// What to do when every remote and cached tier comes back empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Report the failure; callers show an explicit empty state.
    #[default]
    Explicit,
    /// Serve the built-in demo catalog as a last tier.
    Demo,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "explicit" | "empty" | "none" => Ok(Self::Explicit),
            "demo" | "static" => Ok(Self::Demo),
            other => Err(format!("expected `explicit` or `demo`, got `{other}`")),
        }
    }
}

/// Error text from a tier, already rendered for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TierError(pub String);

impl TierError {
    pub fn new(err: impl fmt::Display) -> Self { Self(err.to_string()) }
}

/// One data source in the chain.
#[async_trait]
pub trait Tier<T: Send + Sync>: Send + Sync {
    /// Short name used in logs and reported as the resolution source.
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<Vec<T>, TierError>;

    /// Called with the winning result when an earlier tier answered. Tiers
    /// that cache (the local store) override this.
    async fn remember(&self, _items: &[T]) {}

    /// Whether a successful answer from this tier should be written through
    /// to caching tiers after it.
    fn is_remote(&self) -> bool { false }
}

/// Why a tier did not produce the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub tier: &'static str,
    pub outcome: String,
}

/// Every tier failed or was empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no source returned {resource}: {}", summarize(.attempts))]
    Exhausted { resource: &'static str, attempts: Vec<Attempt> },
}

fn summarize(attempts: &[Attempt]) -> String {
    if attempts.is_empty() { return "no source configured".to_string(); }
    attempts.iter().map(|a| format!("{} ({})", a.tier, a.outcome)).collect::<Vec<_>>().join(", ")
}

/// The winning tier and its items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution<T> {
    pub source: &'static str,
    pub items: Vec<T>,
}

/// Ordered chain of tiers for one resource.
pub struct TieredResolver<T: Send + Sync> {
    resource: &'static str,
    tiers: Vec<Box<dyn Tier<T>>>,
}

impl<T: Send + Sync> fmt::Debug for TieredResolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredResolver")
            .field("resource", &self.resource)
            .field("tiers", &self.tier_names())
            .finish()
    }
}

impl<T: Send + Sync> TieredResolver<T> {
    pub fn new(resource: &'static str) -> Self { Self { resource, tiers: vec![] } }

    #[must_use]
    pub fn with_tier(mut self, tier: impl Tier<T> + 'static) -> Self {
        self.tiers.push(Box::new(tier));
        self
    }

    pub fn tier_names(&self) -> Vec<&'static str> { self.tiers.iter().map(|t| t.name()).collect() }

    /// Ask each tier in order; return the first non-empty answer.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Exhausted`] with one [`Attempt`] per tier when none answered.
    pub async fn resolve(&self) -> Result<Resolution<T>, ResolveError> {
        let mut attempts = Vec::with_capacity(self.tiers.len());
        for (index, tier) in self.tiers.iter().enumerate() {
            debug!(resource = self.resource, tier = tier.name(), "trying tier");
            match tier.fetch().await {
                Ok(items) if !items.is_empty() => {
                    info!(resource = self.resource, tier = tier.name(), count = items.len(), "resolved");
                    if tier.is_remote() {
                        for later in &self.tiers[index + 1..] {
                            later.remember(&items).await;
                        }
                    }
                    return Ok(Resolution { source: tier.name(), items });
                }
                Ok(_) => {
                    debug!(resource = self.resource, tier = tier.name(), "tier returned nothing");
                    attempts.push(Attempt { tier: tier.name(), outcome: "empty".to_string() });
                }
                Err(e) => {
                    warn!(resource = self.resource, tier = tier.name(), error = %e, "tier failed");
                    attempts.push(Attempt { tier: tier.name(), outcome: e.0 });
                }
            }
        }
        warn!(resource = self.resource, "all tiers exhausted");
        Err(ResolveError::Exhausted { resource: self.resource, attempts })
    }
}
