//! Product retrieval: store scopes, merging search hits, similar products.

pub mod product_scope;
pub mod product_search;
pub mod product_store;
pub mod retrieve_products;
pub mod similar_products;
