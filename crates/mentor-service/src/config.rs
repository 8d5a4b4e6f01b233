//! Catalog service configuration.

use std::str::FromStr;

use mentor_core::models::collection::{CollectionCatalog, DEFAULT_COLLECTIONS};
use tracing::warn;

/// Configuration shared by the catalog services.
#[derive(Debug, Clone)]
pub struct MentorConfig {
    /// Collection tags accepted on trainings.
    pub collections: CollectionCatalog,
    /// Days after a session's end date before `archived` is offered
    /// (default: 0, i.e. as soon as it ends).
    pub archive_after_days: i64,
    /// Role whose sub-entity grants imply a restricted grant at the root.
    pub referent_role: String,
    /// The restricted role granted at the root.
    pub referent_restricted_role: String,
    /// Role listed as an entity's managers.
    pub manager_role: String,
    /// Appended to a duplicated training's shortname until it is unique.
    pub copy_suffix: String,
    /// Page size used when a listing asks for zero rows.
    pub default_page_size: u64,
}

impl Default for MentorConfig {
    fn default() -> Self {
        Self {
            collections: CollectionCatalog::parse(DEFAULT_COLLECTIONS),
            archive_after_days: 0,
            referent_role: "referentlocal".into(),
            referent_restricted_role: "reflocalnonediteur".into(),
            manager_role: "admindedie".into(),
            copy_suffix: " copie".into(),
            default_page_size: 50,
        }
    }
}

impl MentorConfig {
    /// Defaults overridden by `MENTOR_COLLECTIONS` (one `tag|label|colour`
    /// per line), `MENTOR_ARCHIVE_AFTER_DAYS`, `MENTOR_REFERENT_ROLE`,
    /// `MENTOR_REFERENT_RESTRICTED_ROLE`, `MENTOR_MANAGER_ROLE`,
    /// `MENTOR_COPY_SUFFIX` and `MENTOR_PAGE_SIZE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, fallback: String| std::env::var(key).unwrap_or(fallback);
        Self {
            collections: std::env::var("MENTOR_COLLECTIONS")
                .map(|raw| CollectionCatalog::parse(&raw))
                .unwrap_or(defaults.collections),
            archive_after_days: parsed("MENTOR_ARCHIVE_AFTER_DAYS", defaults.archive_after_days),
            referent_role: var("MENTOR_REFERENT_ROLE", defaults.referent_role),
            referent_restricted_role: var(
                "MENTOR_REFERENT_RESTRICTED_ROLE",
                defaults.referent_restricted_role,
            ),
            manager_role: var("MENTOR_MANAGER_ROLE", defaults.manager_role),
            copy_suffix: var("MENTOR_COPY_SUFFIX", defaults.copy_suffix),
            default_page_size: parsed("MENTOR_PAGE_SIZE", defaults.default_page_size),
        }
    }
}

fn parsed<T: FromStr + Copy>(key: &str, fallback: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring unparsable setting");
            fallback
        }),
        Err(_) => fallback,
    }
}
