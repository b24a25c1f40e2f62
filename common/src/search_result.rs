use std::fmt::Display;

use serde::{Deserialize, Serialize};


/// Ranked ids returned by the search engine.
///
/// `ordered_ids` is the only source of rank; whoever joins these ids against the
/// product store must keep this order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchHits {
    pub total: u64,
    pub ordered_ids: Vec<u64>,
}

impl SearchHits {
    pub fn new(ordered_ids: Vec<u64>) -> Self {
        Self { total: ordered_ids.len() as u64, ordered_ids }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Position of `id` in the rank order, if it was hit at all.
    pub fn rank_of(&self, id: u64) -> Option<usize> {
        self.ordered_ids.iter().position(|hit| *hit == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultFacets {
    pub facet_field: String,
    pub facet_values: Vec<SearchResultFacetItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultFacetItem {
    pub display_string: String,
    pub original_value: FacetOriginalValue,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum FacetOriginalValue {
    String(String),
    Int(u64),
}

impl Display for FacetOriginalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Int(i) => write!(f, "{}", i),
        }
    }
}

/// One page of store records, in the order they should be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> ResultPage<T> {
    pub fn new(items: Vec<T>, page: u64, per_page: u64, total_count: u64) -> Self {
        let per_page = per_page.max(1);
        Self {
            items,
            page,
            per_page,
            total_count,
            total_pages: total_count.div_ceil(per_page),
        }
    }

    pub fn empty(page: u64, per_page: u64) -> Self {
        Self::new(Vec::new(), page, per_page, 0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_of_follows_hit_order() {
        let hits = SearchHits::new(vec![9, 2, 5]);
        assert_eq!(hits.total, 3);
        assert_eq!(hits.rank_of(9), Some(0));
        assert_eq!(hits.rank_of(5), Some(2));
        assert_eq!(hits.rank_of(7), None);
    }

    #[test]
    fn result_page_counts_pages() {
        let page = ResultPage::new(vec![1, 2], 2, 2, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(ResultPage::<u64>::empty(1, 12).total_pages, 0);
    }

    #[test]
    fn facet_values_deserialize_untagged() {
        let values: Vec<FacetOriginalValue> = serde_json::from_str(r#"["red", 7]"#).unwrap();
        assert_eq!(values, vec![FacetOriginalValue::String("red".into()), FacetOriginalValue::Int(7)]);
    }
}
