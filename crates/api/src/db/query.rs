//! SQL rendering of search predicates.
//!
//! Every clause becomes one parameterized condition; clauses are joined with
//! `AND`. Column references assume the coffee table is aliased `c`.

use sqlx::{Encode, Postgres, QueryBuilder, Type};

use coffee_catalog_core::{FilterClause, PageWindow, Predicate};

/// Coffee listing order. `COLLATE "C"` keeps `lower` to ASCII and ties to
/// byte order, matching [`coffee_catalog_core::compare_names`].
pub const COFFEE_ORDER: &str = r#" ORDER BY lower(c.name COLLATE "C"), c.name COLLATE "C", c.id"#;

/// Tag listing order; the tag table is aliased `t`.
pub const TAG_ORDER: &str = r#" ORDER BY lower(t.name COLLATE "C"), t.name COLLATE "C", t.id"#;

/// Append `WHERE ...` for `predicate`. Appends nothing for an empty predicate.
pub fn push_where(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    for (i, clause) in predicate.clauses().iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        push_clause(builder, clause);
    }
}

/// Append the result order and the `LIMIT`/`OFFSET` of `window`.
pub fn push_window(builder: &mut QueryBuilder<'_, Postgres>, window: PageWindow) {
    builder
        .push(COFFEE_ORDER)
        .push(" LIMIT ")
        .push_bind(window.limit())
        .push(" OFFSET ")
        .push_bind(window.offset());
}

fn push_clause(builder: &mut QueryBuilder<'_, Postgres>, clause: &FilterClause) {
    match clause {
        FilterClause::CreatedBetween { from, to } => {
            push_range(builder, "c.created_at", *from, *to);
        }
        FilterClause::NameContains(needle) => {
            builder
                .push("strpos(lower(c.name), ")
                .push_bind(needle.clone())
                .push(") > 0");
        }
        FilterClause::PriceBetween { min, max } => {
            push_range(builder, "c.price", *min, *max);
        }
        FilterClause::HasAnyTag(names) => {
            builder
                .push(
                    "EXISTS (SELECT 1 FROM catalog.coffee_tag ct \
                     JOIN catalog.tag t ON t.id = ct.tag_id \
                     WHERE ct.coffee_id = c.id AND lower(t.name) = ANY(",
                )
                .push_bind(names.clone())
                .push("))");
        }
    }
}

fn push_range<'args, T>(
    builder: &mut QueryBuilder<'args, Postgres>,
    column: &str,
    lower: Option<T>,
    upper: Option<T>,
) where
    T: 'args + Encode<'args, Postgres> + Type<Postgres>,
{
    builder.push("(");
    match (lower, upper) {
        (Some(lower), Some(upper)) => {
            builder
                .push(column)
                .push(" >= ")
                .push_bind(lower)
                .push(" AND ")
                .push(column)
                .push(" <= ")
                .push_bind(upper);
        }
        (Some(lower), None) => {
            builder.push(column).push(" >= ").push_bind(lower);
        }
        (None, Some(upper)) => {
            builder.push(column).push(" <= ").push_bind(upper);
        }
        (None, None) => {
            builder.push("TRUE");
        }
    }
    builder.push(")");
}
