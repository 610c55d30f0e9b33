//! Document store boundary.
//!
//! The store is an external collaborator consumed through a minimal
//! transactional contract: point reads, plus transactions that buffer
//! set/update writes and apply them atomically on commit.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use platform_core::error::AppError;
use serde_json::Value;
use thiserror::Error;

/// Collections this service touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Members,
    MemberPasses,
    PassTemplates,
    MemberRegistrationRequests,
    FamilyRegistrationRequests,
    PassRequests,
    AuditLogs,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Members => "members",
            Collection::MemberPasses => "member_passes",
            Collection::PassTemplates => "pass_templates",
            Collection::MemberRegistrationRequests => "member_registration_requests",
            Collection::FamilyRegistrationRequests => "family_registration_requests",
            Collection::PassRequests => "pass_requests",
            Collection::AuditLogs => "audit_logs",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    pub collection: Collection,
    pub id: String,
}

impl DocRef {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for DocRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("cannot update missing document {collection}/{id}")]
    MissingDocument { collection: &'static str, id: String },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read outside any transaction.
    async fn get(&self, doc: &DocRef) -> Result<Option<Value>, StoreError>;

    /// Begin a transaction. Dropping the handle without committing discards
    /// every buffered write.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;
}

/// Transaction handle.
///
/// Reads observe the transaction's own buffered writes; writes stay
/// buffered until [`StoreTransaction::commit`] applies them all or nothing.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get(&mut self, doc: &DocRef) -> Result<Option<Value>, StoreError>;

    /// Create or replace a document.
    fn set(&mut self, doc: &DocRef, data: Value);

    /// Merge top-level fields into an existing document. Committing fails if
    /// the document will not exist at commit time.
    fn update(&mut self, doc: &DocRef, partial: Value);

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
