//! Runtime configuration for the search pipeline.
//!
//! Values are read once (usually from the environment) and handed to
//! [`crate::api::products::product_search::ProductSearch`] at construction.

use std::{path::Path, sync::Arc};

use anyhow::Context;
use common::{
    search_const::{DEFAULT_PER_PAGE, DEFAULT_TOTAL_SIMILAR_PRODUCTS},
    search_filters::FilterCatalog,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub products_per_page: u64,
    pub show_zero_stock_products: bool,
    pub total_similar_products: u64,
    /// Fields compared by similar product queries when the caller names none.
    pub similar_product_fields: Vec<String>,
    /// Maximum number of values returned per discrete facet.
    pub facet_limit: u64,
    pub query_timeout_ms: u64,

    pub manticore_url: String,
    pub manticore_index: String,

    pub clickhouse_url: String,
    pub clickhouse_user: String,
    pub clickhouse_password: String,
    pub clickhouse_database: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            products_per_page: DEFAULT_PER_PAGE,
            show_zero_stock_products: false,
            total_similar_products: DEFAULT_TOTAL_SIMILAR_PRODUCTS,
            similar_product_fields: vec!["name".to_string(), "description".to_string()],
            facet_limit: 21,
            query_timeout_ms: 60000,
            manticore_url: "http://127.0.0.1:9308".to_string(),
            manticore_index: "products".to_string(),
            clickhouse_url: "http://localhost:8123".to_string(),
            clickhouse_user: "default".to_string(),
            clickhouse_password: String::new(),
            clickhouse_database: "default".to_string(),
        }
    }
}

impl SearchConfig {
    /// Defaults overridden by whichever environment variables are set.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            products_per_page: env_parse("PRODUCTS_PER_PAGE").unwrap_or(defaults.products_per_page),
            show_zero_stock_products: std::env::var("SHOW_ZERO_STOCK_PRODUCTS")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(defaults.show_zero_stock_products),
            total_similar_products: env_parse("TOTAL_SIMILAR_PRODUCTS").unwrap_or(defaults.total_similar_products),
            similar_product_fields: std::env::var("SIMILAR_PRODUCT_FIELDS")
                .map(|v| v.split(',').map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect())
                .unwrap_or(defaults.similar_product_fields),
            facet_limit: env_parse("FACET_LIMIT").unwrap_or(defaults.facet_limit),
            query_timeout_ms: env_parse("QUERY_TIMEOUT_MS").unwrap_or(defaults.query_timeout_ms),
            manticore_url: std::env::var("MANTICORE_URL").unwrap_or(defaults.manticore_url),
            manticore_index: std::env::var("MANTICORE_INDEX").unwrap_or(defaults.manticore_index),
            clickhouse_url: std::env::var("CLICKHOUSE_URL").unwrap_or(defaults.clickhouse_url),
            clickhouse_user: std::env::var("CLICKHOUSE_USER").unwrap_or(defaults.clickhouse_user),
            clickhouse_password: std::env::var("CLICKHOUSE_PASSWORD").unwrap_or(defaults.clickhouse_password),
            clickhouse_database: std::env::var("CLICKHOUSE_DATABASE").unwrap_or(defaults.clickhouse_database),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parses a filter catalog from its JSON form and checks it.
pub fn parse_filter_catalog(json: &str) -> anyhow::Result<FilterCatalog> {
    let catalog: FilterCatalog = serde_json::from_str(json).context("Failed to parse filter catalog")?;
    catalog.validate()?;
    Ok(catalog)
}

/// Loads the filter catalog once at startup; the result is shared by all requests.
pub fn load_filter_catalog(path: impl AsRef<Path>) -> anyhow::Result<Arc<FilterCatalog>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read filter catalog {}", path.display()))?;
    let catalog = parse_filter_catalog(&json)?;
    tracing::info!("Loaded filter catalog with {} facets from {}", catalog.len(), path.display());
    Ok(Arc::new(catalog))
}
