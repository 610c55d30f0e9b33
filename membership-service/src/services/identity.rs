//! Cached identity resolution against the users collection.

use std::sync::Arc;
use std::time::Duration;

use platform_core::error::AppError;

use crate::models::{IdentitySnapshot, UserRecord};
use crate::services::cache::{CacheStats, TtlCache};
use crate::store::{Collection, DocRef, DocumentStore};

/// Resolves token subjects to their role/status slice, cache first.
///
/// Handlers that mutate a user's identity fields must call [`invalidate`]
/// so the next request observes the change instead of the cached slice.
///
/// [`invalidate`]: IdentityService::invalidate
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn DocumentStore>,
    cache: TtlCache<IdentitySnapshot>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn DocumentStore>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Look up the identity slice for a subject.
    ///
    /// The boolean is true on a cache hit (no store read happened).
    /// `Ok(None)` means no user document exists for this subject.
    pub async fn resolve(
        &self,
        uid: &str,
    ) -> Result<Option<(IdentitySnapshot, bool)>, AppError> {
        if let Some(snapshot) = self.cache.get(uid) {
            return Ok(Some((snapshot, true)));
        }

        let Some(doc) = self.store.get(&DocRef::new(Collection::Users, uid)).await? else {
            return Ok(None);
        };

        let record: UserRecord = serde_json::from_value(doc).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("malformed user document {}: {}", uid, e))
        })?;

        let snapshot = IdentitySnapshot::from(&record);
        self.cache.set(uid, snapshot.clone());
        Ok(Some((snapshot, false)))
    }

    /// Drop the cached slice for one subject.
    pub fn invalidate(&self, uid: &str) -> bool {
        self.cache.invalidate(uid)
    }

    /// Drop every cached slice. Returns how many were dropped.
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
