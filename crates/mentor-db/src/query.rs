//! Composition of listing filters into SurrealQL.
//!
//! Every listing query binds the same parameter set (see
//! [`bind_filter!`]); a condition only appears in the WHERE fragment when
//! its filter is active, so unused parameters are harmless.

use chrono::{DateTime, Utc};
use mentor_core::models::listing::{ScopedQuery, SortSpec};
use mentor_core::models::session::SessionStatus;

use crate::error::DbError;

/// Static description of one listable record type.
#[derive(Debug)]
pub struct Listing {
    pub table: &'static str,
    /// SELECT projection; every sortable column is aliased in it.
    pub projection: &'static str,
    /// Sort column table, indexed by the caller's zero-based column.
    pub sort_columns: &'static [&'static str],
    /// Fields matched by free-text search.
    pub search_fields: &'static [&'static str],
    /// Path of the comma-joined collection tags.
    pub collection_field: &'static str,
    /// Whether start/end date filters apply.
    pub dated: bool,
    /// Whether free-text search also matches status labels.
    pub search_status_labels: bool,
}

pub const TRAINING_PROJECTION: &str = "meta::id(id) AS record_id, \
     meta::id(entity) AS entity_id, entity.name AS entity_name, \
     name, shortname, status, collection, skills, idsirh, \
     created_at, updated_at";

pub const SESSION_PROJECTION: &str = "meta::id(id) AS record_id, \
     meta::id(training) AS training_id, training.name AS training_name, \
     meta::id(entity) AS entity_id, entity.name AS entity_name, \
     training.collection AS collection, course_id, name, shortname, \
     session_number, status, start_date, end_date, terms, \
     max_participants, version, created_at, updated_at";

pub const TRAINING_LISTING: Listing = Listing {
    table: "training",
    projection: TRAINING_PROJECTION,
    sort_columns: &[
        "entity_name",
        "name",
        "shortname",
        "idsirh",
        "status",
        "created_at",
    ],
    search_fields: &["name", "shortname", "entity.name"],
    collection_field: "collection",
    dated: false,
    search_status_labels: false,
};

pub const SESSION_LISTING: Listing = Listing {
    table: "session",
    projection: SESSION_PROJECTION,
    sort_columns: &[
        "entity_name",
        "training_name",
        "name",
        "shortname",
        "session_number",
        "start_date",
        "end_date",
        "status",
    ],
    search_fields: &["name", "shortname", "entity.name"],
    collection_field: "training.collection",
    dated: true,
    search_status_labels: true,
};

/// Values bound into every listing query.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    pub entity_ids: Vec<String>,
    pub collections: Vec<String>,
    pub statuses: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: String,
    pub search_statuses: Vec<String>,
}

/// The WHERE conditions of a listing plus their parameter values.
#[derive(Debug, Clone, Default)]
pub struct FilterClause {
    conditions: Vec<String>,
    pub params: FilterParams,
}

impl FilterClause {
    pub fn compose(listing: &Listing, query: &ScopedQuery) -> Self {
        let mut clause = Self::default();

        clause
            .conditions
            .push("meta::id(entity) IN $entity_ids".into());
        clause.params.entity_ids = query.entity_ids.iter().map(|id| id.to_string()).collect();

        let collections: Vec<String> = query
            .collections
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        if !collections.is_empty() {
            clause.conditions.push(format!(
                "array::len(array::intersect(\
                 string::split(string::lowercase({} ?? ''), ','), $collections)) > 0",
                listing.collection_field
            ));
            clause.params.collections = collections;
        }

        if !query.statuses.is_empty() {
            clause.conditions.push("status IN $statuses".into());
            clause.params.statuses = query.statuses.clone();
        }

        if listing.dated {
            if let Some(start) = query.start_date {
                clause
                    .conditions
                    .push("(start_date != NONE AND start_date >= $start_date)".into());
                clause.params.start_date = Some(start);
            }
            if let Some(end) = query.end_date {
                clause
                    .conditions
                    .push("(start_date != NONE AND start_date <= $end_date)".into());
                clause.params.end_date = Some(end);
            }
        }

        let term = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(term) = term {
            let mut alternatives: Vec<String> = listing
                .search_fields
                .iter()
                .map(|field| format!("string::contains(string::lowercase({field} ?? ''), $search)"))
                .collect();
            if listing.search_status_labels {
                alternatives.push("status IN $search_statuses".into());
                clause.params.search_statuses = SessionStatus::matching_label(term)
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect();
            }
            clause
                .conditions
                .push(format!("({})", alternatives.join(" OR ")));
            clause.params.search = term.to_lowercase();
        }

        clause
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn where_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

/// ORDER BY fragment. Ties, and requests without an order, fall back to
/// the record id, which is time ordered.
pub fn order_sql(listing: &Listing, order: Option<&SortSpec>) -> Result<String, DbError> {
    match order {
        None => Ok("ORDER BY record_id ASC".into()),
        Some(spec) => {
            let column = listing.sort_columns.get(spec.column).ok_or_else(|| {
                DbError::Invalid(format!(
                    "unknown sort column {} for {}",
                    spec.column, listing.table
                ))
            })?;
            Ok(format!(
                "ORDER BY {column} {}, record_id ASC",
                spec.direction.as_sql()
            ))
        }
    }
}

/// Exact-name lookup over the session fields that identify a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactExpression {
    /// OR of case-insensitive equalities, one per field.
    pub clause: String,
    /// Parameter name → value, one per field.
    pub bindings: Vec<(&'static str, String)>,
}

const EXACT_FIELDS: [(&str, &str); 5] = [
    ("exact_entity", "entity.name"),
    ("exact_training", "training.name"),
    ("exact_fullname", "name"),
    ("exact_shortname", "shortname"),
    ("exact_idsirh", "training.idsirh"),
];

pub fn exact_expression(term: &str) -> ExactExpression {
    let value = term.trim().to_lowercase();
    let clause = EXACT_FIELDS
        .iter()
        .map(|(param, field)| format!("string::lowercase({field} ?? '') = ${param}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    let bindings = EXACT_FIELDS
        .iter()
        .map(|(param, _)| (*param, value.clone()))
        .collect();
    ExactExpression {
        clause: format!("({clause})"),
        bindings,
    }
}

/// Bind every [`FilterParams`] value onto a query builder.
macro_rules! bind_filter {
    ($query:expr, $params:expr) => {
        $query
            .bind(("entity_ids", $params.entity_ids.clone()))
            .bind(("collections", $params.collections.clone()))
            .bind(("statuses", $params.statuses.clone()))
            .bind(("start_date", $params.start_date))
            .bind(("end_date", $params.end_date))
            .bind(("search", $params.search.clone()))
            .bind(("search_statuses", $params.search_statuses.clone()))
    };
}

pub(crate) use bind_filter;

#[cfg(test)]
mod tests {
    use super::*;
    use mentor_core::models::listing::SortDirection;
    use mentor_core::repository::Pagination;
    use uuid::Uuid;

    fn query() -> ScopedQuery {
        ScopedQuery {
            entity_ids: vec![Uuid::now_v7()],
            collections: Vec::new(),
            statuses: Vec::new(),
            start_date: None,
            end_date: None,
            search: None,
            order: None,
            pagination: Pagination::default(),
        }
    }

    #[test]
    fn bare_query_only_scopes_by_entity() {
        let clause = FilterClause::compose(&SESSION_LISTING, &query());
        assert_eq!(clause.conditions().len(), 1);
        assert_eq!(clause.where_sql(), "WHERE meta::id(entity) IN $entity_ids");
    }

    #[test]
    fn empty_filters_add_no_conditions() {
        let mut q = query();
        q.collections = vec!["  ".into()];
        q.search = Some("   ".into());
        let clause = FilterClause::compose(&TRAINING_LISTING, &q);
        assert_eq!(clause.conditions().len(), 1);
    }

    #[test]
    fn collections_are_lowercased() {
        let mut q = query();
        q.collections = vec!["Management".into()];
        let clause = FilterClause::compose(&SESSION_LISTING, &q);
        assert_eq!(clause.params.collections, vec!["management"]);
        assert!(clause.where_sql().contains("training.collection"));
    }

    #[test]
    fn date_filters_only_apply_to_dated_listings() {
        let mut q = query();
        q.start_date = Some(Utc::now());
        q.end_date = Some(Utc::now());
        let sessions = FilterClause::compose(&SESSION_LISTING, &q);
        let trainings = FilterClause::compose(&TRAINING_LISTING, &q);
        assert!(sessions.where_sql().contains("$start_date"));
        assert!(sessions.where_sql().contains("$end_date"));
        assert!(!trainings.where_sql().contains("$start_date"));
    }

    #[test]
    fn session_search_includes_status_labels() {
        let mut q = query();
        q.search = Some("Progress".into());
        let clause = FilterClause::compose(&SESSION_LISTING, &q);
        assert_eq!(clause.params.search, "progress");
        assert_eq!(clause.params.search_statuses, vec!["in_progress"]);
        let sql = clause.where_sql();
        assert!(sql.contains("string::lowercase(entity.name ?? '')"));
        assert!(sql.contains("status IN $search_statuses"));

        let trainings = FilterClause::compose(&TRAINING_LISTING, &q);
        assert!(!trainings.where_sql().contains("search_statuses"));
    }

    #[test]
    fn order_maps_columns_and_rejects_unknown() {
        let spec = SortSpec {
            column: 5,
            direction: SortDirection::Desc,
        };
        assert_eq!(
            order_sql(&SESSION_LISTING, Some(&spec)).unwrap(),
            "ORDER BY start_date DESC, record_id ASC"
        );
        assert_eq!(
            order_sql(&SESSION_LISTING, None).unwrap(),
            "ORDER BY record_id ASC"
        );
        let bad = SortSpec {
            column: 42,
            direction: SortDirection::Asc,
        };
        assert!(order_sql(&TRAINING_LISTING, Some(&bad)).is_err());
    }

    #[test]
    fn exact_expression_binds_every_field() {
        let expr = exact_expression("  Fullname3 ");
        assert_eq!(expr.bindings.len(), 5);
        assert!(expr.bindings.iter().all(|(_, v)| v == "fullname3"));
        assert!(expr.clause.starts_with('('));
        assert_eq!(expr.clause.matches(" OR ").count(), 4);
        assert!(expr.clause.contains("training.idsirh"));
    }
}
