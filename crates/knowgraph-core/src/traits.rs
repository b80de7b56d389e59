use crate::Result;
use async_trait::async_trait;

/// Invalidation and reindex hook exposed by the external vector-store
/// collaborator. The freshness engine calls it; it never implements it.
#[async_trait]
pub trait IndexInvalidator: Send + Sync {
    /// Invalidate cached answers of the given query type, or all types when
    /// `query_type` is `None`.
    async fn invalidate(&self, query_type: Option<&str>) -> Result<()>;

    /// Drop every cached answer and learned pattern.
    async fn clear(&self) -> Result<()>;

    /// Ask the collaborator to re-ingest changed documents.
    async fn reindex(&self) -> Result<()>;
}

/// No-op collaborator for tests and standalone operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

#[async_trait]
impl IndexInvalidator for NoopInvalidator {
    async fn invalidate(&self, _query_type: Option<&str>) -> Result<()> {
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn reindex(&self) -> Result<()> {
        Ok(())
    }
}
