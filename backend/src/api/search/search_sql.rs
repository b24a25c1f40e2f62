//! SQL builder helpers for search queries.

pub use common::search_filters::is_sql_identifier;
use common::search_result::FacetOriginalValue;

use crate::api::search::facet_query::{Constraint, ConstraintKind, EngineQuery, FacetDeclaration, FacetRow};
use crate::search_config::SearchConfig;

/// Where and how search SQL runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSqlContext {
    pub index: String,
    pub query_timeout_ms: u64,
    pub facet_limit: u64,
}

impl From<&SearchConfig> for SearchSqlContext {
    fn from(config: &SearchConfig) -> Self {
        Self {
            index: config.manticore_index.clone(),
            query_timeout_ms: config.query_timeout_ms,
            facet_limit: config.facet_limit,
        }
    }
}

impl SearchSqlContext {
    fn from_clause(&self) -> String {
        format!("FROM {}", self.index)
    }

    fn options_clause(&self, max_matches: u64) -> String {
        format!(
            "OPTION max_matches={}, agent_query_timeout={}, max_query_time={}",
            max_matches.max(1),
            self.query_timeout_ms,
            self.query_timeout_ms
        )
    }
}

fn match_clause(keywords: &str) -> Option<String> {
    // quote @ so manticore does not read it as a field selector
    let keywords = keywords.trim().replace("@", "\\@");
    if keywords.is_empty() {
        return None;
    }
    Some(format!("MATCH({})", format_sql_query::QuotedData(&keywords)))
}

fn sql_value(value: &FacetOriginalValue) -> String {
    match value {
        FacetOriginalValue::String(s) => format_sql_query::QuotedData(s).to_string(),
        FacetOriginalValue::Int(i) => i.to_string(),
    }
}

fn constraint_term(constraint: &Constraint) -> String {
    let field_name = &constraint.field;
    match &constraint.kind {
        ConstraintKind::AnyOf(values) => {
            let values_str = values.iter().map(sql_value).collect::<Vec<String>>().join(", ");
            format!("{field_name} IN ({values_str})")
        }
        ConstraintKind::Between { min, max } => format!("{field_name} BETWEEN {min} AND {max}"),
    }
}

fn row_terms(field_name: &str, row: &FacetRow) -> Vec<String> {
    let mut terms = vec![format!("{field_name} >= {}", row.range.min)];
    if let Some(max) = row.range.max {
        terms.push(format!("{field_name} <= {max}"));
    }
    terms
}

fn where_clause(terms: Vec<String>) -> String {
    if terms.is_empty() {
        return String::new();
    }
    format!(
        "WHERE {}",
        terms.join("
        AND ")
    )
}

/// WHERE clause for `query`, leaving out the constraint a facet excludes.
pub fn build_sql_where_clause(query: &EngineQuery, facet: Option<&FacetDeclaration>) -> String {
    where_clause(where_terms(query, facet))
}

fn where_terms(query: &EngineQuery, facet: Option<&FacetDeclaration>) -> Vec<String> {
    let exclude = facet.and_then(|f| f.exclude);
    let mut terms = match_clause(&query.keywords).into_iter().collect::<Vec<_>>();
    terms.extend(query.constraints.iter().filter(|c| Some(c.tag) != exclude).map(constraint_term));
    terms
}

fn order_clause(query: &EngineQuery) -> String {
    let direction = query.order_by.direction.as_sql();
    if query.order_by.is_relevance() {
        format!("ORDER BY WEIGHT() {direction}")
    } else {
        format!("ORDER BY {} {direction}", query.order_by.field)
    }
}

/// Ranked ids of every document matching the query.
pub fn render_hits_sql(ctx: &SearchSqlContext, query: &EngineQuery) -> String {
    let from_clause = ctx.from_clause();
    let sql_where_clause = build_sql_where_clause(query, None);
    let order_clause = order_clause(query);
    let limit = query.per_page;
    let offset = query.page.saturating_sub(1).saturating_mul(query.per_page);
    let options_clause = ctx.options_clause(offset.saturating_add(limit));
    format!(
        "
    SELECT id
    {from_clause}
    {sql_where_clause}
    {order_clause}
    LIMIT {limit} OFFSET {offset}
    {options_clause}
    ;"
    )
}

/// Value counts for a plain facet.
pub fn render_facet_sql(ctx: &SearchSqlContext, query: &EngineQuery, facet: &FacetDeclaration) -> String {
    let from_clause = ctx.from_clause();
    let sql_where_clause = build_sql_where_clause(query, Some(facet));
    let options_clause = ctx.options_clause(query.per_page);
    format!(
        "
        SELECT id
        {from_clause}
        {sql_where_clause}
        LIMIT 0

        {options_clause}

        FACET {} ORDER BY COUNT(*) DESC LIMIT {}
        ;",
        facet.field, ctx.facet_limit,
    )
}

/// Document count for one row of a range facet.
pub fn render_row_count_sql(
    ctx: &SearchSqlContext,
    query: &EngineQuery,
    facet: &FacetDeclaration,
    row: &FacetRow,
) -> String {
    let from_clause = ctx.from_clause();
    let mut terms = where_terms(query, Some(facet));
    terms.extend(row_terms(&facet.field, row));
    let sql_where_clause = where_clause(terms);
    let options_clause = ctx.options_clause(query.per_page);
    format!(
        "
        SELECT COUNT(*) AS total_count
        {from_clause}
        {sql_where_clause}
        {options_clause}
        ;"
    )
}

/// Loads the compared fields of the reference document.
pub fn render_document_fields_sql(ctx: &SearchSqlContext, id: u64, fields: &[String]) -> String {
    let from_clause = ctx.from_clause();
    format!("SELECT id, {} {from_clause} WHERE id = {id} LIMIT 1;", fields.join(", "))
}

/// Documents sharing any of `terms` in `fields`, the reference itself excluded.
pub fn render_more_like_this_sql(
    ctx: &SearchSqlContext,
    reference_id: u64,
    fields: &[String],
    terms: &[String],
    boost_by_relevance: bool,
    page: u64,
    per_page: u64,
) -> String {
    let from_clause = ctx.from_clause();
    let full_text = format!("@({}) \"{}\"/1", fields.join(","), terms.join(" "));
    let match_clause = format!("MATCH({})", format_sql_query::QuotedData(&full_text));
    let order_clause = if boost_by_relevance { "ORDER BY WEIGHT() DESC" } else { "ORDER BY id ASC" };
    let limit = per_page.max(1);
    let offset = page.saturating_sub(1).saturating_mul(limit);
    let options_clause = ctx.options_clause(offset.saturating_add(limit));
    format!(
        "
    SELECT id
    {from_clause}
    WHERE {match_clause}
        AND id <> {reference_id}
    {order_clause}
    LIMIT {limit} OFFSET {offset}
    {options_clause}
    ;"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::search_filters::FacetRange;
    use common::search_query::{OrderBy, SortDirection};

    fn ctx() -> SearchSqlContext {
        SearchSqlContext { index: "products".into(), query_timeout_ms: 5000, facet_limit: 21 }
    }

    fn query() -> EngineQuery {
        let mut query = EngineQuery::new("wool shirt", OrderBy::default(), 500);
        let brand = query.with(
            "brand_id",
            ConstraintKind::AnyOf(vec![FacetOriginalValue::Int(5), FacetOriginalValue::Int(7)]),
        );
        query.with("price", ConstraintKind::Between { min: 10, max: 20 });
        query.facet(FacetDeclaration { field: "brand_id".into(), rows: vec![], exclude: Some(brand) });
        query.facet(FacetDeclaration {
            field: "price".into(),
            rows: vec![
                FacetRow { label: "0..10".into(), range: FacetRange::new(0, 10) },
                FacetRow { label: "10+".into(), range: FacetRange::open(10) },
            ],
            exclude: None,
        });
        query
    }

    #[test]
    fn hits_sql_has_every_constraint_and_whole_catalog_limit() {
        let sql = render_hits_sql(&ctx(), &query());
        assert!(sql.contains("MATCH("));
        assert!(sql.contains("wool shirt"));
        assert!(sql.contains("brand_id IN (5, 7)"));
        assert!(sql.contains("price BETWEEN 10 AND 20"));
        assert!(sql.contains("ORDER BY WEIGHT() DESC"));
        assert!(sql.contains("LIMIT 500 OFFSET 0"));
        assert!(sql.contains("max_matches=500"));
    }

    #[test]
    fn hits_sql_orders_by_field() {
        let mut q = query();
        q.order_by = OrderBy::new("price", SortDirection::Asc);
        assert!(render_hits_sql(&ctx(), &q).contains("ORDER BY price ASC"));
    }

    #[test]
    fn facet_sql_drops_only_its_own_group() {
        let q = query();
        let sql = render_facet_sql(&ctx(), &q, q.facet_for("brand_id").unwrap());
        assert!(!sql.contains("brand_id IN"));
        assert!(sql.contains("price BETWEEN 10 AND 20"));
        assert!(sql.contains("FACET brand_id ORDER BY COUNT(*) DESC LIMIT 21"));
    }

    #[test]
    fn open_row_has_no_upper_bound() {
        let q = query();
        let price = q.facet_for("price").unwrap();
        let closed = render_row_count_sql(&ctx(), &q, price, &price.rows[0]);
        assert!(closed.contains("price >= 0"));
        assert!(closed.contains("price <= 10"));
        let open = render_row_count_sql(&ctx(), &q, price, &price.rows[1]);
        assert!(open.contains("price >= 10"));
        assert!(!open.contains("price <="));
        // range facets keep the brand group and their own range
        assert!(open.contains("brand_id IN (5, 7)"));
        assert!(open.contains("price BETWEEN 10 AND 20"));
    }

    #[test]
    fn blank_keywords_match_everything() {
        let q = EngineQuery::new("  ", OrderBy::default(), 10);
        let sql = render_hits_sql(&ctx(), &q);
        assert!(!sql.contains("MATCH"));
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn keywords_are_quoted_and_at_escaped() {
        let q = EngineQuery::new("it's @name", OrderBy::default(), 10);
        let sql = render_hits_sql(&ctx(), &q);
        assert!(sql.contains("\\@name"));
        assert!(!sql.contains("MATCH(it's"));
    }

    #[test]
    fn more_like_this_excludes_reference() {
        let sql = render_more_like_this_sql(
            &ctx(),
            42,
            &["name".to_string(), "description".to_string()],
            &["wool".to_string(), "shirt".to_string()],
            true,
            1,
            16,
        );
        assert!(sql.contains("@(name,description)"));
        assert!(sql.contains("wool shirt"));
        assert!(sql.contains("id <> 42"));
        assert!(sql.contains("ORDER BY WEIGHT() DESC"));
        assert!(sql.contains("LIMIT 16 OFFSET 0"));
    }

    #[test]
    fn huge_similarity_page_does_not_overflow() {
        let sql = render_more_like_this_sql(&ctx(), 1, &["name".to_string()], &["wool".to_string()], true, 3, u64::MAX);
        assert!(sql.contains(&format!("LIMIT {} OFFSET {}", u64::MAX, u64::MAX)));
        assert!(sql.contains(&format!("max_matches={}", u64::MAX)));
    }

    #[test]
    fn identifiers() {
        assert!(is_sql_identifier("brand_id"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("price desc"));
        assert!(!is_sql_identifier("a;b"));
    }
}
