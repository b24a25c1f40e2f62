use std::{collections::BTreeMap, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use common::search_result::{SearchHits, SearchResultFacets};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::api::search::{
    facet_query::{EngineQuery, FacetDeclaration},
    search_engine::{SearchEngine, SimilarityRequest},
    search_facets::{range_facet_result, value_facet_result},
    search_sql::{
        SearchSqlContext, render_document_fields_sql, render_facet_sql, render_hits_sql, render_more_like_this_sql,
        render_row_count_sql,
    },
};
use crate::search_config::SearchConfig;

/// Most distinct terms taken from the reference document for a similarity match.
const MAX_SIMILARITY_TERMS: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
pub struct RawSearchResult<T> {
    pub hits: RawSearchResultHits<T>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub took: u64,
    pub aggregations: Option<BTreeMap<String, RawSearchResultAggregation>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawSearchResultHits<T> {
    pub hits: Vec<RawSearchResultHit<T>>,
    pub total: u64,
    #[serde(default)]
    pub total_relation: String,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct RawSearchResultAggregation {
    pub buckets: Vec<RawSearchResultAggregationBucket>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RawSearchResultAggregationBucket {
    pub key: serde_json::Value,
    pub doc_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawSearchResultHit<T> {
    pub _source: T,
    #[serde(default)]
    pub _score: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ProductIdRow {
    id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TotalCountRow {
    total_count: u64,
}

/// Manticore over its HTTP SQL endpoint.
#[derive(Debug, Clone)]
pub struct ManticoreEngine {
    client: reqwest::Client,
    url: String,
    sql: SearchSqlContext,
}

impl ManticoreEngine {
    pub fn new(config: &SearchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.query_timeout_ms))
            .build()
            .context("Failed to build manticore http client")?;
        Ok(Self {
            client,
            url: format!("{}/sql", config.manticore_url.trim_end_matches('/')),
            sql: SearchSqlContext::from(config),
        })
    }

    pub async fn manticore_search_sql<T: DeserializeOwned + std::fmt::Debug>(
        &self,
        sql: String,
    ) -> anyhow::Result<RawSearchResult<T>> {
        tracing::debug!("SEARCH SQL: {}", sql);
        let t0 = std::time::Instant::now();

        let response = self.client.post(&self.url).body(sql).send().await.context("Manticore request failed")?;
        let status = response.status();
        let response_txt = response.text().await?;
        if status.is_client_error() || status.is_server_error() {
            anyhow::bail!("Error: {}: {}", status, response_txt);
        }
        tracing::debug!("SEARCH RESPONSE: len = {} ({}ms)", response_txt.len(), t0.elapsed().as_millis());

        let response: RawSearchResult<T> =
            serde_json::from_str(&response_txt).context("Failed to decode manticore response")?;
        if response.timed_out {
            anyhow::bail!("Manticore query timed out after {}ms", response.took);
        }
        Ok(response)
    }

    async fn value_facet(&self, query: &EngineQuery, facet: &FacetDeclaration) -> anyhow::Result<SearchResultFacets> {
        let sql = render_facet_sql(&self.sql, query, facet);
        let response = self.manticore_search_sql::<serde_json::Value>(sql).await?;
        let buckets = response
            .aggregations
            .unwrap_or_default()
            .remove(&facet.field)
            .unwrap_or_default()
            .buckets;
        value_facet_result(facet, buckets)
    }

    async fn range_facet(&self, query: &EngineQuery, facet: &FacetDeclaration) -> anyhow::Result<SearchResultFacets> {
        let counts = try_join_all(facet.rows.iter().map(|row| async move {
            let sql = render_row_count_sql(&self.sql, query, facet, row);
            let response = self.manticore_search_sql::<TotalCountRow>(sql).await?;
            anyhow::Ok(response.hits.hits.first().map(|hit| hit._source.total_count).unwrap_or(0))
        }))
        .await?;
        Ok(range_facet_result(facet, counts))
    }

    async fn similarity_terms(&self, request: &SimilarityRequest) -> anyhow::Result<Vec<String>> {
        let sql = render_document_fields_sql(&self.sql, request.reference_id, &request.fields);
        let response = self.manticore_search_sql::<serde_json::Map<String, serde_json::Value>>(sql).await?;
        let Some(document) = response.hits.hits.into_iter().next() else {
            return Ok(Vec::new());
        };
        let text = request
            .fields
            .iter()
            .filter_map(|field| document._source.get(field).and_then(|v| v.as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(similarity_terms(&text))
    }
}

/// Distinct lowercase words worth matching on, in order of first appearance.
pub fn similarity_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.chars().count() < 3 || terms.contains(&word) {
            continue;
        }
        terms.push(word);
        if terms.len() == MAX_SIMILARITY_TERMS {
            break;
        }
    }
    terms
}

#[async_trait]
impl SearchEngine for ManticoreEngine {
    async fn search(&self, query: &EngineQuery) -> anyhow::Result<SearchHits> {
        let sql = render_hits_sql(&self.sql, query);
        let response = self.manticore_search_sql::<ProductIdRow>(sql).await?;
        Ok(SearchHits {
            total: response.hits.total,
            ordered_ids: response.hits.hits.into_iter().map(|hit| hit._source.id).collect(),
        })
    }

    async fn facet_counts(&self, query: &EngineQuery) -> anyhow::Result<Vec<SearchResultFacets>> {
        try_join_all(query.facets.iter().map(|facet| async move {
            if facet.is_range() { self.range_facet(query, facet).await } else { self.value_facet(query, facet).await }
        }))
        .await
    }

    async fn more_like_this(&self, request: &SimilarityRequest) -> anyhow::Result<SearchHits> {
        let terms = self.similarity_terms(request).await?;
        if terms.is_empty() {
            tracing::warn!("No similarity terms for product {}", request.reference_id);
            return Ok(SearchHits::default());
        }
        let sql = render_more_like_this_sql(
            &self.sql,
            request.reference_id,
            &request.fields,
            &terms,
            request.boost_by_relevance,
            request.page,
            request.per_page,
        );
        let response = self.manticore_search_sql::<ProductIdRow>(sql).await?;
        Ok(SearchHits {
            total: response.hits.total,
            ordered_ids: response.hits.hits.into_iter().map(|hit| hit._source.id).collect(),
        })
    }
}
