use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::api::{
    products::{product_search::ProductSearch, product_store::ProductStore},
    search::{search_engine::SearchEngine, search_error::is_input_error},
};

/// Comma separated field list for similar products.
const SIMILAR_FIELDS_PARAM: &str = "fields";

fn error_response(context: &str, e: anyhow::Error) -> Response {
    if is_input_error(&e) {
        tracing::warn!("{}: rejected request: {}", context, e);
        return (StatusCode::BAD_REQUEST, Body::from(e.to_string())).into_response();
    }
    tracing::error!("{}: request failed: {:#?}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, Body::from(e.to_string())).into_response()
}

pub async fn search_products<E, S>(
    State(search): State<Arc<ProductSearch<E, S>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response
where
    E: SearchEngine + 'static,
    S: ProductStore + 'static,
{
    let props = match search.parse_params(&params) {
        Ok(props) => props,
        Err(e) => return error_response("search_products", e),
    };
    match search.retrieve_products(&props, &[]).await {
        Ok(results) => Json(results).into_response(),
        Err(e) => error_response("search_products", e),
    }
}

pub async fn similar_products<E, S>(
    State(search): State<Arc<ProductSearch<E, S>>>,
    Path(product_id): Path<u64>,
    Query(params): Query<HashMap<String, String>>,
) -> Response
where
    E: SearchEngine + 'static,
    S: ProductStore + 'static,
{
    let props = match search.parse_params(&params) {
        Ok(props) => props,
        Err(e) => return error_response("similar_products", e),
    };
    let fields = params
        .get(SIMILAR_FIELDS_PARAM)
        .map(|f| f.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default();
    match search.similar_products(product_id, &fields, Some(props.total_similar_products)).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => error_response("similar_products", e),
    }
}

pub fn router<E, S>(search: Arc<ProductSearch<E, S>>) -> Router
where
    E: SearchEngine + 'static,
    S: ProductStore + 'static,
{
    Router::new()
        .route("/products", get(search_products::<E, S>))
        .route("/products/{product_id}/similar", get(similar_products::<E, S>))
        .with_state(search)
}
