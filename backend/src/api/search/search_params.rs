//! Turns raw request parameters into [`SearchRequestProperties`].

use std::collections::HashMap;

use common::{
    search_const::{
        FILTER_PARAM_PREFIX, KEYWORDS_PARAM, ORDER_BY_PARAM, ORDER_BY_SEPARATOR, PAGE_PARAM, PER_PAGE_PARAM,
        TAXON_PARAM, TOTAL_SIMILAR_PRODUCTS_PARAM,
    },
    search_query::{ActiveSelection, OrderBy, SearchRequestProperties, SortDirection},
};

use crate::api::search::{search_error::SearchInputError, search_sql::is_sql_identifier};
use crate::search_config::SearchConfig;

pub fn parse_search_params(
    params: &HashMap<String, String>,
    config: &SearchConfig,
) -> anyhow::Result<SearchRequestProperties> {
    let filters = params
        .iter()
        .filter_map(|(key, value)| {
            let param = key.strip_prefix(FILTER_PARAM_PREFIX)?;
            if param.is_empty() || value.trim().is_empty() {
                return None;
            }
            Some((param.to_string(), value.trim().to_string()))
        })
        .collect::<ActiveSelection>();

    let order_by = match params.get(ORDER_BY_PARAM) {
        Some(raw) if !raw.trim().is_empty() => parse_order_by(raw)?,
        _ => OrderBy::default(),
    };

    Ok(SearchRequestProperties {
        keywords: params.get(KEYWORDS_PARAM).map(|k| k.trim().to_string()).unwrap_or_default(),
        taxon_id: positive_param(params, TAXON_PARAM),
        order_by,
        page: positive_param(params, PAGE_PARAM).unwrap_or(1),
        per_page: positive_param(params, PER_PAGE_PARAM).unwrap_or(config.products_per_page),
        filters,
        total_similar_products: positive_param(params, TOTAL_SIMILAR_PRODUCTS_PARAM)
            .unwrap_or(config.total_similar_products),
    })
}

/// `field~direction`; a missing direction means descending.
pub fn parse_order_by(raw: &str) -> anyhow::Result<OrderBy> {
    let mut parts = raw.trim().splitn(2, ORDER_BY_SEPARATOR);
    let field = parts.next().unwrap_or_default().trim();
    if !is_sql_identifier(field) {
        return Err(SearchInputError::InvalidOrderField(field.to_string()).into());
    }
    let direction = match parts.next() {
        None => SortDirection::Desc,
        Some(raw_direction) => SortDirection::parse(raw_direction)
            .ok_or_else(|| SearchInputError::InvalidOrderDirection(raw_direction.to_string()))?,
    };
    Ok(OrderBy::new(field, direction))
}

fn positive_param(params: &HashMap<String, String>, key: &str) -> Option<u64> {
    params.get(key).and_then(|v| v.trim().parse::<u64>().ok()).filter(|v| *v > 0)
}
