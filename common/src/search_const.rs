//! Request parameter names and encoding constants.

/// Raw parameters starting with this prefix are facet selections (`f_color=red`).
pub const FILTER_PARAM_PREFIX: &str = "f_";

/// Joins several selected values of one discrete facet (`red~blue`).
pub const MULTI_VALUE_SEPARATOR: &str = "~";

/// Joins the two bounds of a range selection (`10..20`).
pub const RANGE_SEPARATOR: &str = "..";

/// Joins field and direction in the order parameter (`price~asc`).
pub const ORDER_BY_SEPARATOR: &str = "~";

pub const KEYWORDS_PARAM: &str = "keywords";
pub const TAXON_PARAM: &str = "taxon";
pub const PAGE_PARAM: &str = "page";
pub const PER_PAGE_PARAM: &str = "per_page";
pub const ORDER_BY_PARAM: &str = "order_by";
pub const TOTAL_SIMILAR_PRODUCTS_PARAM: &str = "total_similar_products";

/// Order field that stands for engine relevance.
pub const RELEVANCE_ORDER_FIELD: &str = "score";

/// Similar product queries ask the engine for this many times the wanted count,
/// since some hits get dropped by the availability scope.
pub const SIMILAR_PRODUCTS_HEADROOM: u64 = 4;

/// Products per result page when neither request nor configuration says otherwise.
pub const DEFAULT_PER_PAGE: u64 = 12;

/// Similar products returned when neither request nor configuration says otherwise.
pub const DEFAULT_TOTAL_SIMILAR_PRODUCTS: u64 = 4;
