//! Search filters and the predicate they compile to.
//!
//! A [`SearchFilter`] is what a client asks for: every dimension is optional.
//! [`Predicate::build`] turns it into a closed list of [`FilterClause`]s that
//! are combined with logical AND. Stores either evaluate the clauses directly
//! with [`Predicate::matches`] or render them to SQL; both interpretations
//! must select the same coffees.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::page::DEFAULT_PAGE_SIZE;
use crate::types::Coffee;

/// A client search request.
///
/// Absent fields (and an empty `name` or `tags` list) put no constraint on
/// their dimension. `limit` and `offset` are validated by the search
/// orchestrator, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    /// Case-insensitive substring of the coffee name.
    pub name: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    pub max_price: Option<Decimal>,
    /// Tag names; a coffee matches if it carries any of them (case-insensitive).
    pub tags: Vec<String>,
    /// Inclusive lower bound on the creation timestamp.
    pub start_date: Option<DateTime<Utc>>,
    /// Upper bound on the creation timestamp, extended to the end of its day.
    pub end_date: Option<DateTime<Utc>>,
    /// Page size.
    pub limit: i64,
    /// Number of matching coffees to skip.
    pub offset: i64,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            name: None,
            min_price: None,
            max_price: None,
            tags: Vec::new(),
            start_date: None,
            end_date: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// One independent constraint of a [`Predicate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    /// `from <= created_at <= to`. `to` is already extended to 23:59:59.999.
    CreatedBetween {
        /// Inclusive lower bound.
        from: Option<DateTime<Utc>>,
        /// Inclusive upper bound.
        to: Option<DateTime<Utc>>,
    },
    /// Lowercased needle; the coffee name must contain it, ignoring case.
    NameContains(String),
    /// `min <= price <= max`.
    PriceBetween {
        /// Inclusive lower bound.
        min: Option<Decimal>,
        /// Inclusive upper bound.
        max: Option<Decimal>,
    },
    /// Lowercased, deduplicated tag names; at least one must be carried.
    HasAnyTag(Vec<String>),
}

impl FilterClause {
    /// Evaluate this clause against a coffee with resolved tags.
    #[must_use]
    pub fn matches(&self, coffee: &Coffee) -> bool {
        match self {
            Self::CreatedBetween { from, to } => {
                from.is_none_or(|from| coffee.created_at >= from)
                    && to.is_none_or(|to| coffee.created_at <= to)
            }
            Self::NameContains(needle) => coffee.name.to_lowercase().contains(needle.as_str()),
            Self::PriceBetween { min, max } => {
                let price = coffee.price.amount();
                min.is_none_or(|min| price >= min) && max.is_none_or(|max| price <= max)
            }
            Self::HasAnyTag(names) => coffee
                .tags
                .iter()
                .any(|tag| names.contains(&tag.name.to_lowercase())),
        }
    }

    /// Whether no coffee can ever satisfy this clause.
    #[must_use]
    pub fn is_unsatisfiable(&self) -> bool {
        match self {
            Self::CreatedBetween {
                from: Some(from),
                to: Some(to),
            } => from > to,
            Self::PriceBetween {
                min: Some(min),
                max: Some(max),
            } => min > max,
            _ => false,
        }
    }
}

/// A conjunction of filter clauses.
///
/// An empty predicate matches every coffee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<FilterClause>,
}

impl Predicate {
    /// Compile a search filter. Pure and infallible.
    #[must_use]
    pub fn build(filter: &SearchFilter) -> Self {
        let mut clauses = Vec::new();

        let to = filter.end_date.map(end_of_day);
        if filter.start_date.is_some() || to.is_some() {
            clauses.push(FilterClause::CreatedBetween {
                from: filter.start_date,
                to,
            });
        }

        if let Some(name) = filter.name.as_deref().filter(|name| !name.is_empty()) {
            clauses.push(FilterClause::NameContains(name.to_lowercase()));
        }

        if filter.min_price.is_some() || filter.max_price.is_some() {
            clauses.push(FilterClause::PriceBetween {
                min: filter.min_price,
                max: filter.max_price,
            });
        }

        let names: BTreeSet<String> = filter
            .tags
            .iter()
            .filter(|name| !name.is_empty())
            .map(|name| name.to_lowercase())
            .collect();
        if !names.is_empty() {
            clauses.push(FilterClause::HasAnyTag(names.into_iter().collect()));
        }

        Self { clauses }
    }

    /// The clauses, in the order they were built.
    #[must_use]
    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// Whether the predicate constrains nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether the predicate can never match, e.g. a start date after the end date.
    #[must_use]
    pub fn is_unsatisfiable(&self) -> bool {
        self.clauses.iter().any(FilterClause::is_unsatisfiable)
    }

    /// Evaluate every clause against a coffee.
    #[must_use]
    pub fn matches(&self, coffee: &Coffee) -> bool {
        self.clauses.iter().all(|clause| clause.matches(coffee))
    }
}

/// Move a timestamp to 23:59:59.999 of the same (UTC) calendar day.
#[must_use]
pub fn end_of_day(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .map_or(timestamp, |end| end.and_utc())
}
