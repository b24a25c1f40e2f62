//! HTTP routes served next to the application router.

pub mod search_products;

pub use search_products::router;
