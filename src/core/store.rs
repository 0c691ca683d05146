//! Persistence seam for administered resources

use crate::core::resource::Resource;
use anyhow::Result;
use async_trait::async_trait;

/// Storage backend for one resource type.
///
/// Implementations own identifier assignment: `insert` returns the entity
/// with its new id set. Natural order (what `all` returns) should be stable
/// between calls.
#[async_trait]
pub trait Store<E: Resource>: Send + Sync {
    /// Every record, in natural order
    async fn all(&self) -> Result<Vec<E>>;

    async fn find(&self, id: i64) -> Result<Option<E>>;

    /// Friendly lookup; stores without slugs never match
    async fn find_by_slug(&self, _slug: &str) -> Result<Option<E>> {
        Ok(None)
    }

    /// Records for the given ids. Unknown ids are skipped.
    async fn find_many(&self, ids: &[i64]) -> Result<Vec<E>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.find(*id).await? {
                found.push(record);
            }
        }
        Ok(found)
    }

    async fn insert(&self, entity: E) -> Result<E>;

    async fn update(&self, entity: E) -> Result<E>;

    async fn delete(&self, id: i64) -> Result<()>;
}
