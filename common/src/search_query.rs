//! Shared search request models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::search_const::{DEFAULT_PER_PAGE, DEFAULT_TOTAL_SIMILAR_PRODUCTS, RELEVANCE_ORDER_FIELD};

/// Active facet selections keyed by search param, values still in raw form.
pub type ActiveSelection = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }

    pub fn is_relevance(&self) -> bool {
        self.field == RELEVANCE_ORDER_FIELD
    }
}

impl Default for OrderBy {
    fn default() -> Self {
        Self::new(RELEVANCE_ORDER_FIELD, SortDirection::Desc)
    }
}

/// Everything one product search request asks for.
///
/// Built once from the raw request parameters and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequestProperties {
    pub keywords: String,
    pub taxon_id: Option<u64>,
    pub order_by: OrderBy,
    pub page: u64,
    pub per_page: u64,
    pub filters: ActiveSelection,
    pub total_similar_products: u64,
}

impl Default for SearchRequestProperties {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            taxon_id: None,
            order_by: OrderBy::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            filters: ActiveSelection::new(),
            total_similar_products: DEFAULT_TOTAL_SIMILAR_PRODUCTS,
        }
    }
}
