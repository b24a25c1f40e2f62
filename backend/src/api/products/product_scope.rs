//! Chainable description of a product store query.
//!
//! A scope only records predicates, ordering, associations and the page slice;
//! a [`crate::api::products::product_store::ProductStore`] turns it into rows.

use common::search_result::SearchHits;
use serde::{Deserialize, Serialize};

use crate::api::search::search_error::SearchInputError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScopePredicate {
    /// Not deleted and already available.
    Active,
    InTaxon(u64),
    /// Has stock on hand.
    OnHand,
    IdIn(Vec<u64>),
    /// Matches no rows at all.
    Nothing,
    PriceBetween { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Association {
    Master,
    Images,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScopeOrder {
    #[default]
    Default,
    /// Rows come back in the order of these ids.
    Rank(Vec<u64>),
}

/// An extra scope requested by the caller, applied after the search scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeModifier {
    Named { name: String, args: Vec<String> },
    Plain { name: String },
}

impl ScopeModifier {
    pub fn named(name: impl Into<String>, args: Vec<impl Into<String>>) -> Self {
        Self::Named { name: name.into(), args: args.into_iter().map(Into::into).collect() }
    }

    pub fn plain(name: impl Into<String>) -> Self {
        Self::Plain { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Named { name, .. } | Self::Plain { name } => name,
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            Self::Named { args, .. } => args,
            Self::Plain { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductScope {
    predicates: Vec<ScopePredicate>,
    order: ScopeOrder,
    includes: Vec<Association>,
    page: u64,
    per_page: Option<u64>,
}

impl Default for ProductScope {
    fn default() -> Self {
        Self::all()
    }
}

impl ProductScope {
    /// Every product, unsliced.
    pub fn all() -> Self {
        Self { predicates: Vec::new(), order: ScopeOrder::Default, includes: Vec::new(), page: 1, per_page: None }
    }

    fn with_predicate(mut self, predicate: ScopePredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn active(self) -> Self {
        self.with_predicate(ScopePredicate::Active)
    }

    pub fn in_taxon(self, taxon_id: u64) -> Self {
        self.with_predicate(ScopePredicate::InTaxon(taxon_id))
    }

    pub fn on_hand(self) -> Self {
        self.with_predicate(ScopePredicate::OnHand)
    }

    pub fn price_between(self, min: f64, max: f64) -> Self {
        self.with_predicate(ScopePredicate::PriceBetween { min, max })
    }

    /// Narrows to `ids`. The first id list applied also fixes the row order.
    pub fn with_ids(mut self, ids: Vec<u64>) -> Self {
        if self.order == ScopeOrder::Default {
            self.order = ScopeOrder::Rank(ids.clone());
        }
        self.with_predicate(ScopePredicate::IdIn(ids))
    }

    pub fn none(self) -> Self {
        self.with_predicate(ScopePredicate::Nothing)
    }

    /// Intersects with search hits. Zero hits narrow to nothing, never to everything.
    pub fn with_hits(self, hits: &SearchHits) -> Self {
        if hits.total > 0 { self.with_ids(hits.ordered_ids.clone()) } else { self.none() }
    }

    pub fn includes(mut self, associations: &[Association]) -> Self {
        for association in associations {
            if !self.includes.contains(association) {
                self.includes.push(*association);
            }
        }
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn per(mut self, per_page: u64) -> Self {
        self.per_page = Some(per_page.max(1));
        self
    }

    pub fn apply_modifier(self, modifier: &ScopeModifier) -> anyhow::Result<Self> {
        let name = modifier.name();
        let args = modifier.args();
        let scope = match name {
            "active" => no_args(name, args).map(|_| self.active())?,
            "on_hand" => no_args(name, args).map(|_| self.on_hand())?,
            "in_taxon" => match args {
                [taxon_id] => self.in_taxon(parse_arg(name, taxon_id)?),
                _ => return Err(bad_args(name, "expected one taxon id")),
            },
            "with_ids" => {
                let ids = args.iter().map(|id| parse_arg(name, id)).collect::<anyhow::Result<Vec<u64>>>()?;
                self.with_ids(ids)
            }
            "price_between" => match args {
                [min, max] => self.price_between(parse_arg(name, min)?, parse_arg(name, max)?),
                _ => return Err(bad_args(name, "expected min and max price")),
            },
            _ => return Err(SearchInputError::UnknownScope(name.to_string()).into()),
        };
        Ok(scope)
    }

    pub fn apply_modifiers(self, modifiers: &[ScopeModifier]) -> anyhow::Result<Self> {
        modifiers.iter().try_fold(self, |scope, modifier| scope.apply_modifier(modifier))
    }

    pub fn predicates(&self) -> &[ScopePredicate] {
        &self.predicates
    }

    pub fn order(&self) -> &ScopeOrder {
        &self.order
    }

    pub fn included(&self) -> &[Association] {
        &self.includes
    }

    pub fn includes_association(&self, association: Association) -> bool {
        self.includes.contains(&association)
    }

    pub fn current_page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> Option<u64> {
        self.per_page
    }

    /// `(limit, offset)` of the page slice, if the scope is paginated.
    ///
    /// An offset past `u64::MAX` saturates, which selects an empty page.
    pub fn limit_offset(&self) -> Option<(u64, u64)> {
        self.per_page.map(|per_page| (per_page, (self.page - 1).saturating_mul(per_page)))
    }

    /// True when some predicate rules out every row.
    pub fn is_empty_by_construction(&self) -> bool {
        self.predicates.iter().any(|p| match p {
            ScopePredicate::Nothing => true,
            ScopePredicate::IdIn(ids) => ids.is_empty(),
            _ => false,
        })
    }

    /// Same predicates and associations, without the page slice.
    pub fn unpaginated(&self) -> Self {
        Self { page: 1, per_page: None, ..self.clone() }
    }
}

fn no_args(name: &str, args: &[String]) -> anyhow::Result<()> {
    if args.is_empty() { Ok(()) } else { Err(bad_args(name, "takes no arguments")) }
}

fn parse_arg<T: std::str::FromStr>(name: &str, raw: &str) -> anyhow::Result<T> {
    raw.trim().parse::<T>().map_err(|_| bad_args(name, &format!("cannot parse {raw:?}")))
}

fn bad_args(name: &str, reason: &str) -> anyhow::Error {
    SearchInputError::InvalidScopeArguments { scope: name.to_string(), reason: reason.to_string() }.into()
}
