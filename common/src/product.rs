//! Product records as returned by the product store.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: f64,
    pub count_on_hand: i64,
    /// Loaded only when the scope includes the master association.
    pub master: Option<ProductVariant>,
    /// Loaded only when the scope includes the images association.
    pub images: Vec<ProductImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: u64,
    pub product_id: u64,
    pub sku: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: u64,
    pub product_id: u64,
    pub position: u32,
    pub url: String,
}
