//! Engine and store adapters.

pub mod clickhouse_utils;
pub mod manticore_utils;

#[cfg(test)]
pub(crate) mod test_utils;
