use std::sync::Arc;

use sqlx::PgPool;

use crate::db::Cache;
use crate::stores::{
    InMemoryProfileStore, InMemoryVariantVectorStore, PgProfileStore, PgVariantVectorStore,
    ProfileStore, VariantVectorStore,
};

/// Shared application state
///
/// Stores are behind trait objects so the Postgres-backed deployment and
/// the in-memory test/local setup share the same handlers.
#[derive(Clone)]
pub struct AppState {
    pub vectors: Arc<dyn VariantVectorStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub cache: Option<Cache>,
    pub cache_ttl_secs: u64,
}

impl AppState {
    /// State backed by Postgres, with an optional Redis read cache
    pub fn postgres(pool: PgPool, cache: Option<Cache>, cache_ttl_secs: u64) -> Self {
        Self {
            vectors: Arc::new(PgVariantVectorStore::new(pool.clone())),
            profiles: Arc::new(PgProfileStore::new(pool)),
            cache,
            cache_ttl_secs,
        }
    }

    /// Fully in-memory state, used by tests and local runs without
    /// infrastructure
    pub fn in_memory() -> Self {
        Self {
            vectors: Arc::new(InMemoryVariantVectorStore::new()),
            profiles: Arc::new(InMemoryProfileStore::new()),
            cache: None,
            cache_ttl_secs: 0,
        }
    }
}
