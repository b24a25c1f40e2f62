//! Caller errors raised while turning request input into queries and scopes.

use thiserror::Error;

/// Errors caused by the request itself rather than the engine or the store.
///
/// They travel inside `anyhow::Error`; use [`is_input_error`] to tell them apart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchInputError {
    #[error("Malformed range for filter {param}: {raw:?} (expected \"min..max\")")]
    MalformedRange { param: String, raw: String },

    #[error("Invalid value for numeric filter {param}: {raw:?}")]
    InvalidFilterValue { param: String, raw: String },

    #[error("Invalid order field: {0:?}")]
    InvalidOrderField(String),

    #[error("Invalid order direction: {0:?}")]
    InvalidOrderDirection(String),

    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),

    #[error("Unknown scope: {0}")]
    UnknownScope(String),

    #[error("Invalid arguments for scope {scope}: {reason}")]
    InvalidScopeArguments { scope: String, reason: String },
}

pub fn is_input_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<SearchInputError>().is_some()
}
