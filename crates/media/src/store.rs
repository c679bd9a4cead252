//! Backend contracts for media rows and their storage objects.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use keepsake_core::{DataAccessError, EventId, MediaId};

use crate::media::{Media, MediaFilter};

/// Object-storage failure, separate from record access: a missing or
/// undeletable object must not block removal of the record.
#[derive(Debug, Error)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

/// Read/delete access to media records.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Media for an event matching `filter`, newest first.
    async fn list_for_event(
        &self,
        event_id: EventId,
        filter: MediaFilter,
    ) -> Result<Vec<Media>, DataAccessError>;

    async fn delete(&self, id: MediaId) -> Result<(), DataAccessError>;
}

/// The blob store holding uploaded files.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Public URL for a stored object path.
    fn public_url(&self, path: &str) -> String;

    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl<S> MediaStore for Arc<S>
where
    S: MediaStore + ?Sized,
{
    async fn list_for_event(
        &self,
        event_id: EventId,
        filter: MediaFilter,
    ) -> Result<Vec<Media>, DataAccessError> {
        (**self).list_for_event(event_id, filter).await
    }

    async fn delete(&self, id: MediaId) -> Result<(), DataAccessError> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<S> ObjectStorage for Arc<S>
where
    S: ObjectStorage + ?Sized,
{
    fn public_url(&self, path: &str) -> String {
        (**self).public_url(path)
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        (**self).remove(path).await
    }
}
