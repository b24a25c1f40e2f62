//! Joins ranked search hits with a store scope into one page of products.

use common::{product::Product, search_result::{ResultPage, SearchHits}};

use crate::api::products::{
    product_scope::{Association, ProductScope},
    product_store::ProductStore,
};

/// Associations loaded for search result pages.
pub const RESULT_ASSOCIATIONS: &[Association] = &[Association::Master];

/// Narrows `base_scope` to the hit ids, keeping hit rank as row order.
pub fn merge_search_hits(base_scope: ProductScope, hits: &SearchHits) -> ProductScope {
    base_scope.with_hits(hits)
}

/// Loads the scope's page together with the totals needed to paginate it.
pub async fn fetch_result_page<S: ProductStore + ?Sized>(
    store: &S,
    scope: &ProductScope,
) -> anyhow::Result<ResultPage<Product>> {
    let page = scope.current_page();
    let per_page = scope.per_page().unwrap_or(u64::MAX);
    if scope.is_empty_by_construction() {
        return Ok(ResultPage::empty(page, per_page));
    }
    let total_count = store.count(&scope.unpaginated()).await?;
    let items = store.fetch(scope).await?;
    Ok(ResultPage::new(items, page, per_page, total_count))
}

/// Final page for a search: hits merged into `base_scope`, associations loaded,
/// sliced to `(page, per_page)`.
pub async fn retrieve_products_page<S: ProductStore + ?Sized>(
    store: &S,
    base_scope: ProductScope,
    hits: &SearchHits,
    page: u64,
    per_page: u64,
) -> anyhow::Result<ResultPage<Product>> {
    let scope = merge_search_hits(base_scope, hits).includes(RESULT_ASSOCIATIONS).page(page).per(per_page);
    fetch_result_page(store, &scope).await
}
