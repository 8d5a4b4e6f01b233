//! Catalog listing requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::Pagination;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Zero-based column index plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: usize,
    pub direction: SortDirection,
}

/// A caller-supplied listing descriptor.
///
/// Empty filter lists mean "no filter"; an empty search term matches
/// everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRequest {
    pub entity_id: Uuid,
    pub sub_entities: Vec<Uuid>,
    pub collections: Vec<String>,
    pub statuses: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
    /// `None` keeps creation order.
    pub order: Option<SortSpec>,
    pub pagination: Pagination,
}

impl ListingRequest {
    pub fn for_entity(entity_id: Uuid) -> Self {
        Self {
            entity_id,
            sub_entities: Vec::new(),
            collections: Vec::new(),
            statuses: Vec::new(),
            start_date: None,
            end_date: None,
            search: None,
            order: None,
            pagination: Pagination::default(),
        }
    }
}

/// A listing request with its entity scope already resolved.
#[derive(Debug, Clone)]
pub struct ScopedQuery {
    /// Deduplicated entity ids the records must belong to.
    pub entity_ids: Vec<Uuid>,
    pub collections: Vec<String>,
    pub statuses: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub order: Option<SortSpec>,
    pub pagination: Pagination,
}
