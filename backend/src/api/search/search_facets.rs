//! Shapes raw engine aggregations into facet results.

use std::collections::HashSet;

use common::search_result::{FacetOriginalValue, SearchResultFacetItem, SearchResultFacets};

use crate::api::search::facet_query::FacetDeclaration;
use crate::db_utils::manticore_utils::RawSearchResultAggregationBucket;

/// Value facet: highest counts first, duplicates dropped keeping their highest count.
pub fn value_facet_result(
    facet: &FacetDeclaration,
    mut buckets: Vec<RawSearchResultAggregationBucket>,
) -> anyhow::Result<SearchResultFacets> {
    let mut result = SearchResultFacets { facet_field: facet.field.clone(), facet_values: Vec::new() };

    buckets.sort_by_key(|bucket| u64::MAX - bucket.doc_count);
    let mut present_values = HashSet::new();
    for bucket in buckets {
        let original_value = match &bucket.key {
            serde_json::Value::String(s) => FacetOriginalValue::String(s.clone()),
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(v) => FacetOriginalValue::Int(v),
                None => anyhow::bail!("Non integer facet value from manticore for {}: {}", facet.field, n),
            },
            _ => anyhow::bail!("Invalid value from manticore related to facets: {:#?}", bucket.key),
        };
        if !present_values.insert(original_value.clone()) {
            continue;
        }
        result.facet_values.push(SearchResultFacetItem {
            display_string: original_value.to_string(),
            original_value,
            count: bucket.doc_count,
        });
    }
    result.facet_values.sort_by_key(|item| (u64::MAX - item.count, item.display_string.clone()));

    Ok(result)
}

/// Range facet: one item per row, in catalog order, labelled by the row.
pub fn range_facet_result(facet: &FacetDeclaration, counts: Vec<u64>) -> SearchResultFacets {
    SearchResultFacets {
        facet_field: facet.field.clone(),
        facet_values: facet
            .rows
            .iter()
            .zip(counts)
            .map(|(row, count)| SearchResultFacetItem {
                display_string: row.label.clone(),
                original_value: FacetOriginalValue::String(row.label.clone()),
                count,
            })
            .collect(),
    }
}
