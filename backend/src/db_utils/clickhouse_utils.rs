//! ClickHouse backed product store.

use std::collections::HashMap;

use async_trait::async_trait;
use clickhouse::Row;
use common::product::{Product, ProductImage, ProductVariant};
use serde::Deserialize;

use crate::api::products::{
    product_scope::{Association, ProductScope, ScopeOrder, ScopePredicate},
    product_store::ProductStore,
};
use crate::search_config::SearchConfig;

const PRODUCT_COLUMNS: &str = "id, name, slug, description, price, count_on_hand";

pub fn get_clickhouse_client(config: &SearchConfig) -> clickhouse::Client {
    clickhouse::Client::default()
        .with_url(&config.clickhouse_url)
        .with_user(&config.clickhouse_user)
        .with_password(&config.clickhouse_password)
        .with_database(&config.clickhouse_database)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeBind {
    UInt(u64),
    UIntList(Vec<u64>),
    Float(f64),
}

/// SQL text with `?` placeholders and the values bound to them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeSql {
    pub sql: String,
    pub binds: Vec<ScopeBind>,
}

impl ScopeSql {
    fn into_query(self, client: &clickhouse::Client) -> clickhouse::query::Query {
        let mut query = client.query(&self.sql);
        for bind in self.binds {
            query = match bind {
                ScopeBind::UInt(v) => query.bind(v),
                ScopeBind::UIntList(v) => query.bind(v),
                ScopeBind::Float(v) => query.bind(v),
            };
        }
        query
    }
}

fn predicate_term(predicate: &ScopePredicate, binds: &mut Vec<ScopeBind>) -> String {
    match predicate {
        ScopePredicate::Active => "isNull(deleted_at) AND available_on <= now()".to_string(),
        ScopePredicate::InTaxon(taxon_id) => {
            binds.push(ScopeBind::UInt(*taxon_id));
            "has(taxon_ids, ?)".to_string()
        }
        ScopePredicate::OnHand => "count_on_hand > 0".to_string(),
        ScopePredicate::IdIn(ids) if ids.is_empty() => "0 = 1".to_string(),
        ScopePredicate::IdIn(ids) => {
            binds.push(ScopeBind::UIntList(ids.clone()));
            "id IN ?".to_string()
        }
        ScopePredicate::Nothing => "0 = 1".to_string(),
        ScopePredicate::PriceBetween { min, max } => {
            binds.push(ScopeBind::Float(*min));
            binds.push(ScopeBind::Float(*max));
            "price BETWEEN ? AND ?".to_string()
        }
    }
}

fn where_clause(scope: &ProductScope, binds: &mut Vec<ScopeBind>) -> String {
    let terms = scope.predicates().iter().map(|p| format!("({})", predicate_term(p, binds))).collect::<Vec<_>>();
    if terms.is_empty() {
        return String::new();
    }
    format!("WHERE {}", terms.join(" AND "))
}

/// Rows of the scope's page, in scope order.
pub fn render_fetch_sql(scope: &ProductScope) -> ScopeSql {
    let mut binds = Vec::new();
    let where_clause = where_clause(scope, &mut binds);
    let order_clause = match scope.order() {
        ScopeOrder::Rank(ids) => {
            binds.push(ScopeBind::UIntList(ids.clone()));
            "ORDER BY indexOf(?, id), id"
        }
        ScopeOrder::Default => "ORDER BY id",
    };
    let limit_clause = match scope.limit_offset() {
        Some((limit, offset)) => format!("LIMIT {limit} OFFSET {offset}"),
        None => String::new(),
    };
    ScopeSql {
        sql: format!("SELECT {PRODUCT_COLUMNS} FROM products {where_clause} {order_clause} {limit_clause}")
            .trim_end()
            .to_string(),
        binds,
    }
}

pub fn render_count_sql(scope: &ProductScope) -> ScopeSql {
    let mut binds = Vec::new();
    let where_clause = where_clause(scope, &mut binds);
    ScopeSql { sql: format!("SELECT count() FROM products {where_clause}").trim_end().to_string(), binds }
}

#[derive(Debug, Row, Deserialize)]
struct ProductRow {
    id: u64,
    name: String,
    slug: String,
    description: String,
    price: f64,
    count_on_hand: i64,
}

#[derive(Debug, Row, Deserialize)]
struct VariantRow {
    id: u64,
    product_id: u64,
    sku: String,
    price: f64,
}

#[derive(Debug, Row, Deserialize)]
struct ImageRow {
    id: u64,
    product_id: u64,
    position: u32,
    url: String,
}

pub struct ClickHouseStore {
    client: clickhouse::Client,
}

impl ClickHouseStore {
    pub fn new(config: &SearchConfig) -> Self {
        Self { client: get_clickhouse_client(config) }
    }

    async fn load_masters(&self, product_ids: &[u64]) -> anyhow::Result<HashMap<u64, ProductVariant>> {
        let sql = "
        SELECT id, product_id, sku, price
        FROM variants
        WHERE is_master = 1
          AND product_id IN ?
        ";
        let rows = self.client.query(sql).bind(product_ids.to_vec()).fetch_all::<VariantRow>().await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                (row.product_id, ProductVariant { id: row.id, product_id: row.product_id, sku: row.sku, price: row.price })
            })
            .collect())
    }

    async fn load_images(&self, product_ids: &[u64]) -> anyhow::Result<HashMap<u64, Vec<ProductImage>>> {
        let sql = "
        SELECT id, product_id, position, url
        FROM product_images
        WHERE product_id IN ?
        ORDER BY product_id, position
        ";
        let rows = self.client.query(sql).bind(product_ids.to_vec()).fetch_all::<ImageRow>().await?;
        let mut images: HashMap<u64, Vec<ProductImage>> = HashMap::new();
        for row in rows {
            images.entry(row.product_id).or_default().push(ProductImage {
                id: row.id,
                product_id: row.product_id,
                position: row.position,
                url: row.url,
            });
        }
        Ok(images)
    }
}

#[async_trait]
impl ProductStore for ClickHouseStore {
    async fn fetch(&self, scope: &ProductScope) -> anyhow::Result<Vec<Product>> {
        let scope_sql = render_fetch_sql(scope);
        tracing::debug!("PRODUCT SQL: {}", scope_sql.sql);
        let rows = scope_sql.into_query(&self.client).fetch_all::<ProductRow>().await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids = rows.iter().map(|row| row.id).collect::<Vec<_>>();
        let mut masters = if scope.includes_association(Association::Master) {
            self.load_masters(&product_ids).await?
        } else {
            HashMap::new()
        };
        let mut images = if scope.includes_association(Association::Images) {
            self.load_images(&product_ids).await?
        } else {
            HashMap::new()
        };

        Ok(rows
            .into_iter()
            .map(|row| Product {
                master: masters.remove(&row.id),
                images: images.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                slug: row.slug,
                description: row.description,
                price: row.price,
                count_on_hand: row.count_on_hand,
            })
            .collect())
    }

    async fn count(&self, scope: &ProductScope) -> anyhow::Result<u64> {
        let count = render_count_sql(scope).into_query(&self.client).fetch_one::<u64>().await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::search_result::SearchHits;

    #[test]
    fn ranked_scope_orders_by_hit_position() {
        let scope = ProductScope::all()
            .active()
            .on_hand()
            .with_hits(&SearchHits::new(vec![9, 2, 5]))
            .page(2)
            .per(12);
        let rendered = render_fetch_sql(&scope);
        assert!(rendered.sql.contains("(isNull(deleted_at) AND available_on <= now())"));
        assert!(rendered.sql.contains("(count_on_hand > 0)"));
        assert!(rendered.sql.contains("(id IN ?)"));
        assert!(rendered.sql.contains("ORDER BY indexOf(?, id), id"));
        assert!(rendered.sql.ends_with("LIMIT 12 OFFSET 12"));
        assert_eq!(
            rendered.binds,
            vec![ScopeBind::UIntList(vec![9, 2, 5]), ScopeBind::UIntList(vec![9, 2, 5])]
        );
    }

    #[test]
    fn zero_hits_render_an_always_false_predicate() {
        let scope = ProductScope::all().in_taxon(3).with_hits(&SearchHits::default());
        let rendered = render_count_sql(&scope);
        assert_eq!(rendered.sql, "SELECT count() FROM products WHERE (has(taxon_ids, ?)) AND (0 = 1)");
        assert_eq!(rendered.binds, vec![ScopeBind::UInt(3)]);
    }

    #[test]
    fn binds_follow_placeholder_order() {
        let scope = ProductScope::all().price_between(5.0, 9.5).in_taxon(4);
        let rendered = render_fetch_sql(&scope);
        assert_eq!(rendered.binds, vec![ScopeBind::Float(5.0), ScopeBind::Float(9.5), ScopeBind::UInt(4)]);
        assert!(rendered.sql.ends_with("ORDER BY id"));
    }

    #[test]
    fn unscoped_count_has_no_where() {
        assert_eq!(render_count_sql(&ProductScope::all()).sql, "SELECT count() FROM products");
    }
}
