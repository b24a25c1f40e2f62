//! The search engine as seen by the product search pipeline.

use async_trait::async_trait;
use common::search_result::{SearchHits, SearchResultFacets};
use serde::{Deserialize, Serialize};

use crate::api::search::facet_query::EngineQuery;

/// "More like this" request for one reference document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityRequest {
    pub reference_id: u64,
    pub fields: Vec<String>,
    pub boost_by_relevance: bool,
    pub page: u64,
    pub per_page: u64,
}

/// Runs built queries. Every call goes to the engine; nothing is cached or retried.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Total hit count and ids in rank order.
    async fn search(&self, query: &EngineQuery) -> anyhow::Result<SearchHits>;

    /// Counts for every facet the query declares, in declaration order.
    async fn facet_counts(&self, query: &EngineQuery) -> anyhow::Result<Vec<SearchResultFacets>>;

    async fn more_like_this(&self, request: &SimilarityRequest) -> anyhow::Result<SearchHits>;
}
