//! In-memory engine and store used by the tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{
    product::{Product, ProductImage, ProductVariant},
    search_result::{SearchHits, SearchResultFacets},
};

use crate::api::{
    products::{
        product_scope::{Association, ProductScope, ScopeOrder, ScopePredicate},
        product_store::ProductStore,
    },
    search::{
        facet_query::EngineQuery,
        search_engine::{SearchEngine, SimilarityRequest},
    },
};

/// Returns canned hits and records every query it is given.
#[derive(Default)]
pub struct MemoryEngine {
    hits: SearchHits,
    similar: SearchHits,
    fail: bool,
    queries: Mutex<Vec<EngineQuery>>,
    similarity_requests: Mutex<Vec<SimilarityRequest>>,
    search_calls: AtomicUsize,
}

impl MemoryEngine {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn with_hits(mut self, hits: SearchHits) -> Self {
        self.hits = hits;
        self
    }

    pub fn with_similar(mut self, similar: SearchHits) -> Self {
        self.similar = similar;
        self
    }

    pub fn queries(&self) -> Vec<EngineQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn similarity_requests(&self) -> Vec<SimilarityRequest> {
        self.similarity_requests.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn search(&self, query: &EngineQuery) -> anyhow::Result<SearchHits> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("search index unavailable");
        }
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.hits.clone())
    }

    async fn facet_counts(&self, query: &EngineQuery) -> anyhow::Result<Vec<SearchResultFacets>> {
        if self.fail {
            anyhow::bail!("search index unavailable");
        }
        Ok(query
            .facets
            .iter()
            .map(|facet| SearchResultFacets { facet_field: facet.field.clone(), facet_values: Vec::new() })
            .collect())
    }

    async fn more_like_this(&self, request: &SimilarityRequest) -> anyhow::Result<SearchHits> {
        if self.fail {
            anyhow::bail!("search index unavailable");
        }
        self.similarity_requests.lock().unwrap().push(request.clone());
        Ok(self.similar.clone())
    }
}

#[derive(Debug, Clone)]
pub struct StoredProduct {
    pub product: Product,
    pub active: bool,
    pub taxon_ids: Vec<u64>,
}

impl StoredProduct {
    /// Active, in stock, in taxon 1, with a master variant and one image.
    pub fn sample(id: u64) -> Self {
        Self {
            product: Product {
                id,
                name: format!("Product {id}"),
                slug: format!("product-{id}"),
                description: String::new(),
                price: id as f64,
                count_on_hand: 5,
                master: Some(ProductVariant { id: id * 100, product_id: id, sku: format!("SKU-{id}"), price: id as f64 }),
                images: vec![ProductImage { id: id * 1000, product_id: id, position: 1, url: format!("/img/{id}.png") }],
            },
            active: true,
            taxon_ids: vec![1],
        }
    }

    fn matches(&self, predicate: &ScopePredicate) -> bool {
        match predicate {
            ScopePredicate::Active => self.active,
            ScopePredicate::InTaxon(taxon_id) => self.taxon_ids.contains(taxon_id),
            ScopePredicate::OnHand => self.product.count_on_hand > 0,
            ScopePredicate::IdIn(ids) => ids.contains(&self.product.id),
            ScopePredicate::Nothing => false,
            ScopePredicate::PriceBetween { min, max } => self.product.price >= *min && self.product.price <= *max,
        }
    }
}

/// Evaluates scopes over a fixed product list.
pub struct MemoryStore {
    products: Vec<StoredProduct>,
    honor_rank: bool,
    fetch_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(products: Vec<StoredProduct>) -> Self {
        Self { products, honor_rank: true, fetch_calls: AtomicUsize::new(0) }
    }

    /// Returns rows in id order even for ranked scopes.
    pub fn ignoring_rank(mut self) -> Self {
        self.honor_rank = false;
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn matching(&self, scope: &ProductScope) -> Vec<&StoredProduct> {
        let mut rows = self
            .products
            .iter()
            .filter(|stored| scope.predicates().iter().all(|p| stored.matches(p)))
            .collect::<Vec<_>>();
        rows.sort_by_key(|stored| stored.product.id);
        if let (ScopeOrder::Rank(ids), true) = (scope.order(), self.honor_rank) {
            rows.sort_by_key(|stored| ids.iter().position(|id| *id == stored.product.id).unwrap_or(usize::MAX));
        }
        rows
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn fetch(&self, scope: &ProductScope) -> anyhow::Result<Vec<Product>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.matching(scope);
        let (limit, offset) = scope.limit_offset().unwrap_or((u64::MAX, 0));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit.min(usize::MAX as u64) as usize)
            .map(|stored| {
                let mut product = stored.product.clone();
                if !scope.includes_association(Association::Master) {
                    product.master = None;
                }
                if !scope.includes_association(Association::Images) {
                    product.images.clear();
                }
                product
            })
            .collect())
    }

    async fn count(&self, scope: &ProductScope) -> anyhow::Result<u64> {
        Ok(self.matching(scope).len() as u64)
    }
}
