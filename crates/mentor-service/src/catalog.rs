//! Entity-scoped catalog listings.
//!
//! A listing covers the requested entity and all of its descendants,
//! optionally narrowed to an explicit set of sub-entities. Filtering,
//! sorting and paging happen in the repositories; this layer checks the
//! viewer, resolves the scope and normalizes the request.

use mentor_core::error::MentorResult;
use mentor_core::models::listing::{ListingRequest, ScopedQuery};
use mentor_core::models::role::Capability;
use mentor_core::models::session::Session;
use mentor_core::models::training::Training;
use mentor_core::repository::{
    EntityRepository, PaginatedResult, Pagination, SessionRepository, TrainingRepository,
};
use tracing::debug;
use uuid::Uuid;

use crate::access::AccessPolicy;
use crate::config::MentorConfig;
use crate::entity::descendant_ids;

/// Read side of the catalog: session and training listings.
///
/// Every read requires `ViewCatalog` on the requested entity.
pub struct CatalogService<E, T, S, A>
where
    E: EntityRepository,
    T: TrainingRepository,
    S: SessionRepository,
    A: AccessPolicy,
{
    entities: E,
    trainings: T,
    sessions: S,
    access: A,
    config: MentorConfig,
}

impl<E, T, S, A> CatalogService<E, T, S, A>
where
    E: EntityRepository,
    T: TrainingRepository,
    S: SessionRepository,
    A: AccessPolicy,
{
    pub fn new(entities: E, trainings: T, sessions: S, access: A, config: MentorConfig) -> Self {
        Self {
            entities,
            trainings,
            sessions,
            access,
            config,
        }
    }

    pub async fn list_sessions(
        &self,
        viewer: Uuid,
        request: &ListingRequest,
    ) -> MentorResult<PaginatedResult<Session>> {
        let query = self.scope(viewer, request).await?;
        self.sessions.search(&query).await
    }

    /// Total matches for the request, ignoring its paging window.
    pub async fn count_sessions(&self, viewer: Uuid, request: &ListingRequest) -> MentorResult<u64> {
        let query = self.scope(viewer, request).await?;
        self.sessions.count(&query).await
    }

    pub async fn list_trainings(
        &self,
        viewer: Uuid,
        request: &ListingRequest,
    ) -> MentorResult<PaginatedResult<Training>> {
        let query = self.scope(viewer, request).await?;
        self.trainings.search(&query).await
    }

    /// Total matches for the request, ignoring its paging window.
    pub async fn count_trainings(&self, viewer: Uuid, request: &ListingRequest) -> MentorResult<u64> {
        let query = self.scope(viewer, request).await?;
        self.trainings.count(&query).await
    }

    /// Sessions under `entity_id` whose entity, training, name, shortname
    /// or training external id equals `term`, ignoring case.
    pub async fn find_sessions_by_exact_name(
        &self,
        viewer: Uuid,
        entity_id: Uuid,
        term: &str,
    ) -> MentorResult<Vec<Session>> {
        self.entities.get_by_id(entity_id).await?;
        self.access
            .require(viewer, Capability::ViewCatalog, entity_id)
            .await?;
        let scope = descendant_ids(&self.entities, entity_id).await?;
        self.sessions.find_exact(&scope, term).await
    }

    async fn scope(&self, viewer: Uuid, request: &ListingRequest) -> MentorResult<ScopedQuery> {
        self.entities.get_by_id(request.entity_id).await?;
        self.access
            .require(viewer, Capability::ViewCatalog, request.entity_id)
            .await?;
        let mut entity_ids = descendant_ids(&self.entities, request.entity_id).await?;
        if !request.sub_entities.is_empty() {
            entity_ids.retain(|id| request.sub_entities.contains(id));
        }

        let pagination = if request.pagination.limit == 0 {
            Pagination {
                offset: request.pagination.offset,
                limit: self.config.default_page_size,
            }
        } else {
            request.pagination
        };

        debug!(
            entity_id = %request.entity_id,
            scope = entity_ids.len(),
            "Resolved listing scope"
        );

        Ok(ScopedQuery {
            entity_ids,
            collections: request.collections.clone(),
            statuses: request.statuses.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            search: request.search.clone(),
            order: request.order,
            pagination,
        })
    }
}
