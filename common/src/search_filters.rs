//! Facet definitions that make up the filter catalog.
//!
//! The catalog is loaded once at startup and shared read-only by every request.
//! Each definition is either a discrete value facet or a range bucketed facet;
//! which one is decided by looking at its first value.

use serde::{Deserialize, Serialize};

use crate::search_const::RANGE_SEPARATOR;
use crate::search_result::FacetOriginalValue;

/// Inclusive numeric bucket. `max = None` means no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacetRange {
    pub min: i64,
    #[serde(default)]
    pub max: Option<i64>,
}

impl FacetRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max: Some(max) }
    }

    pub fn open(min: i64) -> Self {
        Self { min, max: None }
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.min && self.max.is_none_or(|max| value <= max)
    }

    /// `"10..20"` for a closed bucket, `"10+"` for an open one.
    pub fn label(&self) -> String {
        match self.max {
            Some(max) => format!("{}{}{}", self.min, RANGE_SEPARATOR, max),
            None => format!("{}+", self.min),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetValue {
    Range(FacetRange),
    Discrete(FacetOriginalValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetDefinition {
    pub search_param: String,
    pub values: Vec<FacetValue>,
}

impl FacetDefinition {
    pub fn discrete(search_param: impl Into<String>, values: Vec<FacetOriginalValue>) -> Self {
        Self {
            search_param: search_param.into(),
            values: values.into_iter().map(FacetValue::Discrete).collect(),
        }
    }

    pub fn ranges(search_param: impl Into<String>, values: Vec<FacetRange>) -> Self {
        Self {
            search_param: search_param.into(),
            values: values.into_iter().map(FacetValue::Range).collect(),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self.values.first(), Some(FacetValue::Range(_)))
    }

    /// True when the first discrete value is numeric, so selections must be numeric too.
    pub fn has_int_values(&self) -> bool {
        matches!(self.values.first(), Some(FacetValue::Discrete(FacetOriginalValue::Int(_))))
    }

    pub fn range_values(&self) -> impl Iterator<Item = &FacetRange> {
        self.values.iter().filter_map(|value| match value {
            FacetValue::Range(range) => Some(range),
            FacetValue::Discrete(_) => None,
        })
    }
}

/// Column and index names are interpolated into search SQL as is, so they must be plain identifiers.
pub fn is_sql_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    MixedValueKinds(String),
    DuplicateParam(String),
    InvalidParam(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MixedValueKinds(param) => write!(f, "Facet {} mixes range and discrete values", param),
            Self::DuplicateParam(param) => write!(f, "Facet {} is declared more than once", param),
            Self::InvalidParam(param) => write!(f, "Facet param {:?} is not a plain column name", param),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Ordered facet definitions. Facets are declared on queries in this order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterCatalog {
    filters: Vec<FacetDefinition>,
}

impl FilterCatalog {
    pub fn new(filters: Vec<FacetDefinition>) -> Result<Self, CatalogError> {
        let catalog = Self { filters };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = std::collections::HashSet::new();
        for filter in &self.filters {
            if !is_sql_identifier(&filter.search_param) {
                return Err(CatalogError::InvalidParam(filter.search_param.clone()));
            }
            if !seen.insert(filter.search_param.as_str()) {
                return Err(CatalogError::DuplicateParam(filter.search_param.clone()));
            }
            let is_range = filter.is_range();
            let mixed = filter.values.iter().any(|value| matches!(value, FacetValue::Range(_)) != is_range);
            if mixed {
                return Err(CatalogError::MixedValueKinds(filter.search_param.clone()));
            }
        }
        Ok(())
    }

    pub fn filters(&self) -> &[FacetDefinition] {
        &self.filters
    }

    pub fn find(&self, search_param: &str) -> Option<&FacetDefinition> {
        self.filters.iter().find(|filter| filter.search_param == search_param)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
