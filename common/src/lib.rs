//! Common library exports shared between the search backend and its callers.

extern crate serde;


pub mod search_const;
pub mod search_filters;
pub mod search_query;
pub mod search_result;
pub mod product;
