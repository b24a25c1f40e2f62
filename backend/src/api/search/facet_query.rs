//! Builds the engine query for one product search: keywords, ordering, one facet
//! per catalog entry, and the active selections as constraints.
//!
//! Discrete selections become an OR group that is tagged; the facet for the same
//! param names that tag in `exclude`, so its counts are computed as if the group
//! were absent. Every other facet still sees the group. Range facets are
//! declared as fixed rows (the last one open ended) and never exclude anything.

use common::{
    search_const::{MULTI_VALUE_SEPARATOR, RANGE_SEPARATOR},
    search_filters::{FacetDefinition, FacetRange, FilterCatalog},
    search_query::{OrderBy, SearchRequestProperties},
    search_result::FacetOriginalValue,
};
use serde::{Deserialize, Serialize};

use crate::api::search::search_error::SearchInputError;

/// Identifies one constraint group inside an [`EngineQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintTag(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Matches documents whose field equals any of the values.
    AnyOf(Vec<FacetOriginalValue>),
    /// Inclusive on both ends.
    Between { min: i64, max: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub tag: ConstraintTag,
    pub field: String,
    pub kind: ConstraintKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetRow {
    pub label: String,
    pub range: FacetRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetDeclaration {
    pub field: String,
    /// Empty for a plain value facet.
    pub rows: Vec<FacetRow>,
    /// Constraint group ignored when counting this facet.
    pub exclude: Option<ConstraintTag>,
}

impl FacetDeclaration {
    pub fn is_range(&self) -> bool {
        !self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineQuery {
    pub keywords: String,
    pub order_by: OrderBy,
    pub page: u64,
    pub per_page: u64,
    pub constraints: Vec<Constraint>,
    pub facets: Vec<FacetDeclaration>,
}

impl EngineQuery {
    pub fn new(keywords: impl Into<String>, order_by: OrderBy, per_page: u64) -> Self {
        Self {
            keywords: keywords.into(),
            order_by,
            page: 1,
            per_page: per_page.max(1),
            constraints: Vec::new(),
            facets: Vec::new(),
        }
    }

    /// Adds a constraint and returns the tag facets can use to exclude it.
    pub fn with(&mut self, field: impl Into<String>, kind: ConstraintKind) -> ConstraintTag {
        let tag = ConstraintTag(self.constraints.len());
        self.constraints.push(Constraint { tag, field: field.into(), kind });
        tag
    }

    pub fn facet(&mut self, declaration: FacetDeclaration) {
        self.facets.push(declaration);
    }

    pub fn constraint(&self, tag: ConstraintTag) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.tag == tag)
    }

    /// Constraints a facet declaration counts with.
    pub fn constraints_for<'a>(&'a self, facet: &FacetDeclaration) -> impl Iterator<Item = &'a Constraint> {
        let exclude = facet.exclude;
        self.constraints.iter().filter(move |c| Some(c.tag) != exclude)
    }

    pub fn facet_for(&self, field: &str) -> Option<&FacetDeclaration> {
        self.facets.iter().find(|f| f.field == field)
    }
}

/// Builds the query for `props` against `catalog`.
///
/// `catalog_size` becomes the page size so the engine returns every matching id;
/// user facing pagination happens later against the product store. Selections
/// for params the catalog does not declare are ignored.
pub fn build_facet_query(
    catalog: &FilterCatalog,
    props: &SearchRequestProperties,
    catalog_size: u64,
) -> anyhow::Result<EngineQuery> {
    let mut query = EngineQuery::new(props.keywords.clone(), props.order_by.clone(), catalog_size);

    for filter in catalog.filters() {
        let selection = props.filters.get(&filter.search_param).map(|s| s.trim()).filter(|s| !s.is_empty());

        if filter.is_range() {
            query.facet(FacetDeclaration {
                field: filter.search_param.clone(),
                rows: range_rows(filter),
                exclude: None,
            });
            if let Some(raw) = selection {
                let (min, max) = parse_range_selection(&filter.search_param, raw)?;
                query.with(filter.search_param.clone(), ConstraintKind::Between { min, max });
            }
            continue;
        }

        let values = match selection {
            Some(raw) => parse_discrete_selection(filter, raw)?,
            None => Vec::new(),
        };
        if values.is_empty() {
            query.facet(FacetDeclaration { field: filter.search_param.clone(), rows: Vec::new(), exclude: None });
            continue;
        }

        let tag = query.with(filter.search_param.clone(), ConstraintKind::AnyOf(values));
        query.facet(FacetDeclaration { field: filter.search_param.clone(), rows: Vec::new(), exclude: Some(tag) });
    }

    tracing::debug!(
        "Built facet query: {} constraints, {} facets, per_page {}",
        query.constraints.len(),
        query.facets.len(),
        query.per_page
    );
    Ok(query)
}

fn range_rows(filter: &FacetDefinition) -> Vec<FacetRow> {
    let ranges = filter.range_values().collect::<Vec<_>>();
    let last = ranges.len().saturating_sub(1);
    ranges
        .into_iter()
        .enumerate()
        .map(|(i, range)| {
            let range = if i == last { FacetRange::open(range.min) } else { *range };
            FacetRow { label: range.label(), range }
        })
        .collect()
}

/// `"min..max"`, both bounds integers.
pub fn parse_range_selection(param: &str, raw: &str) -> anyhow::Result<(i64, i64)> {
    let malformed = || SearchInputError::MalformedRange { param: param.to_string(), raw: raw.to_string() };
    let bounds = raw.split(RANGE_SEPARATOR).collect::<Vec<_>>();
    let [min, max] = bounds.as_slice() else {
        return Err(malformed().into());
    };
    let min = min.trim().parse::<i64>().map_err(|_| malformed())?;
    let max = max.trim().parse::<i64>().map_err(|_| malformed())?;
    Ok((min, max))
}

fn parse_discrete_selection(filter: &FacetDefinition, raw: &str) -> anyhow::Result<Vec<FacetOriginalValue>> {
    let mut values = Vec::new();
    for value in raw.split(MULTI_VALUE_SEPARATOR).map(str::trim).filter(|v| !v.is_empty()) {
        let value = if filter.has_int_values() {
            let parsed = value.parse::<u64>().map_err(|_| SearchInputError::InvalidFilterValue {
                param: filter.search_param.clone(),
                raw: value.to_string(),
            })?;
            FacetOriginalValue::Int(parsed)
        } else {
            FacetOriginalValue::String(value.to_string())
        };
        if !values.contains(&value) {
            values.push(value);
        }
    }
    Ok(values)
}
