//! Product search service: one value per process, shared by all requests.

use std::{collections::HashMap, sync::Arc};

use common::{
    product::Product,
    search_filters::FilterCatalog,
    search_query::SearchRequestProperties,
    search_result::{ResultPage, SearchResultFacets},
};
use serde::{Deserialize, Serialize};

use crate::api::{
    products::{
        product_scope::{ProductScope, ScopeModifier},
        product_store::ProductStore,
        retrieve_products::{fetch_result_page, merge_search_hits, RESULT_ASSOCIATIONS},
        similar_products::similar_products,
    },
    search::{build_facet_query, parse_search_params, search_engine::SearchEngine},
};
use crate::search_config::SearchConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSearchResults {
    pub page: ResultPage<Product>,
    /// Hits reported by the engine, before store side filtering.
    pub total_hits: u64,
    pub facets: Vec<SearchResultFacets>,
}

pub struct ProductSearch<E, S> {
    config: SearchConfig,
    catalog: Arc<FilterCatalog>,
    engine: E,
    store: S,
}

impl<E: SearchEngine, S: ProductStore> ProductSearch<E, S> {
    pub fn new(config: SearchConfig, catalog: Arc<FilterCatalog>, engine: E, store: S) -> Self {
        Self { config, catalog, engine, store }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn catalog(&self) -> &FilterCatalog {
        &self.catalog
    }

    pub fn parse_params(&self, params: &HashMap<String, String>) -> anyhow::Result<SearchRequestProperties> {
        parse_search_params(params, &self.config)
    }

    /// Active products, in the taxon if one is given, in stock unless zero stock
    /// products are shown.
    pub fn base_scope(&self, taxon_id: Option<u64>) -> ProductScope {
        let mut scope = ProductScope::all().active();
        if let Some(taxon_id) = taxon_id {
            scope = scope.in_taxon(taxon_id);
        }
        if !self.config.show_zero_stock_products {
            scope = scope.on_hand();
        }
        scope
    }

    pub async fn retrieve_products(
        &self,
        props: &SearchRequestProperties,
        modifiers: &[ScopeModifier],
    ) -> anyhow::Result<ProductSearchResults> {
        // the engine page holds the whole catalog; users page through the store
        let catalog_size = self.store.count(&ProductScope::all()).await?.max(1);
        let query = build_facet_query(&self.catalog, props, catalog_size)?;

        let hits = self.engine.search(&query).await?;
        let facets = self.engine.facet_counts(&query).await?;
        tracing::info!("Product search {:?}: {} hits", props.keywords, hits.total);

        let scope = merge_search_hits(self.base_scope(props.taxon_id), &hits)
            .apply_modifiers(modifiers)?
            .includes(RESULT_ASSOCIATIONS)
            .page(props.page)
            .per(props.per_page);
        let page = fetch_result_page(&self.store, &scope).await?;

        Ok(ProductSearchResults { page, total_hits: hits.total, facets })
    }

    /// Similar products to `product_id` compared on `fields` (configured fields
    /// when empty); `total` defaults to the configured count.
    pub async fn similar_products(
        &self,
        product_id: u64,
        fields: &[String],
        total: Option<u64>,
    ) -> anyhow::Result<Vec<Product>> {
        let fields = if fields.is_empty() { self.config.similar_product_fields.as_slice() } else { fields };
        let total = total.filter(|t| *t > 0).unwrap_or(self.config.total_similar_products);
        similar_products(&self.engine, &self.store, self.base_scope(None), product_id, fields, total).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::search::{
        facet_query::ConstraintKind,
        search_error::{is_input_error, SearchInputError},
    };
    use crate::db_utils::test_utils::{MemoryEngine, MemoryStore, StoredProduct};
    use common::{
        search_filters::{FacetDefinition, FacetRange},
        search_result::{FacetOriginalValue, SearchHits},
    };

    fn catalog() -> Arc<FilterCatalog> {
        Arc::new(
            FilterCatalog::new(vec![
                FacetDefinition::ranges("price", vec![FacetRange::new(0, 10), FacetRange::new(10, 20), FacetRange::new(20, 30)]),
                FacetDefinition::discrete("color", vec![FacetOriginalValue::String("red".into())]),
            ])
            .unwrap(),
        )
    }

    fn service(engine: MemoryEngine, store: MemoryStore) -> ProductSearch<MemoryEngine, MemoryStore> {
        ProductSearch::new(SearchConfig::default(), catalog(), engine, store)
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn search_runs_query_then_merges_in_rank_order() {
        let store = MemoryStore::new((1..=10).map(StoredProduct::sample).collect());
        let search = service(MemoryEngine::default().with_hits(SearchHits::new(vec![9, 2, 5])), store);
        let props = search.parse_params(&params(&[("keywords", "shirt"), ("f_color", "red~blue")])).unwrap();

        let results = search.retrieve_products(&props, &[]).await.unwrap();
        assert_eq!(results.total_hits, 3);
        assert_eq!(results.page.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![9, 2, 5]);
        assert_eq!(results.facets.len(), 2);

        let queries = search.engine.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].per_page, 10);
        assert_eq!(queries[0].keywords, "shirt");
        assert_eq!(
            queries[0].constraints[0].kind,
            ConstraintKind::AnyOf(vec![
                FacetOriginalValue::String("red".into()),
                FacetOriginalValue::String("blue".into()),
            ])
        );
    }

    #[tokio::test]
    async fn zero_hits_give_an_empty_page_whatever_the_store_holds() {
        let store = MemoryStore::new((1..=10).map(StoredProduct::sample).collect());
        let search = service(MemoryEngine::default(), store);
        let results = search.retrieve_products(&SearchRequestProperties::default(), &[]).await.unwrap();
        assert!(results.page.is_empty());
        assert_eq!(results.total_hits, 0);
    }

    #[tokio::test]
    async fn out_of_stock_products_hidden_unless_configured() {
        let mut products = (1..=3).map(StoredProduct::sample).collect::<Vec<_>>();
        products[0].product.count_on_hand = 0;
        let hits = SearchHits::new(vec![1, 2, 3]);

        let search = service(MemoryEngine::default().with_hits(hits.clone()), MemoryStore::new(products.clone()));
        let results = search.retrieve_products(&SearchRequestProperties::default(), &[]).await.unwrap();
        assert_eq!(results.page.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 3]);

        let config = SearchConfig { show_zero_stock_products: true, ..SearchConfig::default() };
        let search = ProductSearch::new(config, catalog(), MemoryEngine::default().with_hits(hits), MemoryStore::new(products));
        let results = search.retrieve_products(&SearchRequestProperties::default(), &[]).await.unwrap();
        assert_eq!(results.page.items.len(), 3);
    }

    #[tokio::test]
    async fn taxon_and_modifiers_narrow_the_page() {
        let mut products = (1..=4).map(StoredProduct::sample).collect::<Vec<_>>();
        products[3].taxon_ids = vec![99];
        let search = service(
            MemoryEngine::default().with_hits(SearchHits::new(vec![4, 3, 2, 1])),
            MemoryStore::new(products),
        );
        let props = SearchRequestProperties { taxon_id: Some(99), ..SearchRequestProperties::default() };
        let results = search.retrieve_products(&props, &[]).await.unwrap();
        assert_eq!(results.page.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![4]);

        let results = search
            .retrieve_products(&SearchRequestProperties::default(), &[ScopeModifier::named("with_ids", vec!["1", "3"])])
            .await
            .unwrap();
        assert_eq!(results.page.items.iter().map(|p| p.id).collect::<Vec<_>>(), vec![3, 1]);
    }

    #[tokio::test]
    async fn malformed_range_rejects_the_request() {
        let search = service(MemoryEngine::default(), MemoryStore::new(vec![]));
        let props = search.parse_params(&params(&[("f_price", "abc..20")])).unwrap();
        let err = search.retrieve_products(&props, &[]).await.unwrap_err();
        assert!(is_input_error(&err));
        assert!(search.engine.queries().is_empty());
        assert!(matches!(err.downcast_ref::<SearchInputError>(), Some(SearchInputError::MalformedRange { .. })));
    }

    #[tokio::test]
    async fn engine_failure_is_not_retried() {
        let search = service(MemoryEngine::failing(), MemoryStore::new(vec![StoredProduct::sample(1)]));
        let err = search.retrieve_products(&SearchRequestProperties::default(), &[]).await.unwrap_err();
        assert!(!is_input_error(&err));
        assert_eq!(search.engine.search_calls(), 1);
    }

    #[tokio::test]
    async fn similar_products_use_configured_defaults() {
        let engine = MemoryEngine::default().with_similar(SearchHits::new(vec![30, 10, 20, 40, 50]));
        let store = MemoryStore::new([10, 20, 30, 40, 50].into_iter().map(StoredProduct::sample).collect());
        let search = service(engine, store);
        let products = search.similar_products(1, &[], None).await.unwrap();
        assert_eq!(products.iter().map(|p| p.id).collect::<Vec<_>>(), vec![30, 10, 20, 40]);
        let request = &search.engine.similarity_requests()[0];
        assert_eq!(request.fields, vec!["name".to_string(), "description".to_string()]);
        assert_eq!(request.per_page, 16);
    }
}
