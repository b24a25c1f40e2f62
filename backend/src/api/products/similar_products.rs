//! "More like this" products, restricted to what is available and kept in
//! engine rank order.

use common::{product::Product, search_const::SIMILAR_PRODUCTS_HEADROOM};

use crate::api::{
    products::{
        product_scope::{Association, ProductScope},
        product_store::ProductStore,
    },
    search::{
        search_engine::{SearchEngine, SimilarityRequest},
        search_error::SearchInputError,
        search_sql::is_sql_identifier,
    },
};

/// Associations loaded for similar products.
pub const SIMILAR_ASSOCIATIONS: &[Association] = &[Association::Images, Association::Master];

/// Up to `total` products similar to `product_id`, most similar first.
///
/// The engine is asked for a few times more hits than wanted because the
/// availability scope drops some. Fewer than `total` results is not an error.
pub async fn similar_products<E, S>(
    engine: &E,
    store: &S,
    base_scope: ProductScope,
    product_id: u64,
    fields: &[String],
    total: u64,
) -> anyhow::Result<Vec<Product>>
where
    E: SearchEngine + ?Sized,
    S: ProductStore + ?Sized,
{
    if let Some(field) = fields.iter().find(|f| !is_sql_identifier(f)) {
        return Err(SearchInputError::InvalidFieldName(field.clone()).into());
    }
    let per_page = total.max(1).saturating_mul(SIMILAR_PRODUCTS_HEADROOM);
    let request = SimilarityRequest {
        reference_id: product_id,
        fields: fields.to_vec(),
        boost_by_relevance: true,
        page: 1,
        per_page,
    };
    let hits = engine.more_like_this(&request).await?;
    tracing::debug!("Similar products for {}: {} hits", product_id, hits.total);

    let scope = base_scope.with_hits(&hits).includes(SIMILAR_ASSOCIATIONS).page(1).per(per_page);
    if scope.is_empty_by_construction() {
        return Ok(Vec::new());
    }
    let mut products = store.fetch(&scope).await?;

    products.sort_by_key(|product| hits.rank_of(product.id).unwrap_or(usize::MAX));
    products.truncate(usize::try_from(total).unwrap_or(usize::MAX));
    Ok(products)
}
