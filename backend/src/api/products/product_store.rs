//! The persistent product store as seen by the search pipeline.

use async_trait::async_trait;
use common::product::Product;

use crate::api::products::product_scope::ProductScope;

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Rows matching the scope, in scope order, sliced to the scope's page, with
    /// the scope's associations loaded.
    async fn fetch(&self, scope: &ProductScope) -> anyhow::Result<Vec<Product>>;

    /// Number of rows matching the scope, ignoring the page slice.
    async fn count(&self, scope: &ProductScope) -> anyhow::Result<u64>;
}
