//! Backend library entry point: faceted product search over Manticore and ClickHouse.

pub mod api;
pub mod db_utils;
pub mod search_config;
pub mod server_extra;
