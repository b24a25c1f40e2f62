//! Faceted search: request parsing, query building, SQL rendering and execution.

pub mod facet_query;
pub mod search_engine;
pub mod search_error;
pub mod search_facets;
pub mod search_params;
pub mod search_sql;

pub use facet_query::build_facet_query;
pub use search_params::parse_search_params;
