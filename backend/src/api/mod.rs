//! Search and product API.

pub mod products;
pub mod search;
