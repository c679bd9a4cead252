//! Local mirror of an event's media, kept live by the change feed.

use tracing::{debug, warn};

use keepsake_core::{DataAccessError, EventId, MediaId};

use crate::feed::{MediaChange, MediaChangeFeed, MediaSubscription};
use crate::media::{Media, MediaFilter};
use crate::store::{MediaStore, ObjectStorage};

/// Maintains the gallery's in-memory list for one event.
///
/// `load` is the source of truth (full replace); the subscription only keeps
/// the mirror fresh between loads. Changes may arrive duplicated or for
/// items outside the current filter; applying them is idempotent.
#[derive(Debug)]
pub struct MediaSynchronizer<S, O, F> {
    store: S,
    storage: O,
    feed: F,
    event_id: EventId,
    filter: MediaFilter,
    items: Vec<Media>,
    subscription: Option<MediaSubscription>,
}

impl<S, O, F> MediaSynchronizer<S, O, F>
where
    S: MediaStore,
    O: ObjectStorage,
    F: MediaChangeFeed,
{
    pub fn new(store: S, storage: O, feed: F, event_id: EventId) -> Self {
        Self {
            store,
            storage,
            feed,
            event_id,
            filter: MediaFilter::All,
            items: Vec::new(),
            subscription: None,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn items(&self) -> &[Media] {
        &self.items
    }

    /// Filter used by the last load.
    pub fn filter(&self) -> MediaFilter {
        self.filter
    }

    /// Replace the local list with a fresh read, newest first, resolving
    /// public URLs for stored objects.
    pub async fn load(&mut self, filter: MediaFilter) -> Result<(), DataAccessError> {
        let mut items = self.store.list_for_event(self.event_id, filter).await?;
        for media in &mut items {
            self.resolve_url(media);
        }
        debug!(event_id = %self.event_id, count = items.len(), "media loaded");
        self.filter = filter;
        self.items = items;
        Ok(())
    }

    /// Open a live subscription for this event. Any previous subscription is
    /// dropped, so at most one is active per synchronizer.
    pub fn subscribe(&mut self) {
        self.subscription = Some(self.feed.subscribe(self.event_id));
    }

    pub fn unsubscribe(&mut self) {
        self.subscription = None;
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Apply every change queued on the subscription. Returns how many were
    /// applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let change = match &self.subscription {
                Some(sub) => match sub.try_recv() {
                    Ok(change) => change,
                    Err(_) => break,
                },
                None => break,
            };
            self.apply(change);
            applied += 1;
        }
        applied
    }

    /// Fold one change into the local list.
    ///
    /// Inserts go to the front (newest first); an insert for an id already
    /// present replaces it in place, and a delete for an unknown id is a
    /// no-op.
    pub fn apply(&mut self, change: MediaChange) {
        match change {
            MediaChange::Inserted(mut media) => {
                self.resolve_url(&mut media);
                if let Some(existing) = self.items.iter_mut().find(|m| m.id == media.id) {
                    *existing = media;
                } else {
                    self.items.insert(0, media);
                }
            }
            MediaChange::Deleted(id) => {
                self.items.retain(|m| m.id != id);
            }
        }
    }

    /// Delete one item: the storage object first, then the record.
    ///
    /// A storage failure (object already gone, transient blob-store error)
    /// is logged and skipped so the record still gets removed; a record
    /// failure propagates and leaves the local list untouched.
    pub async fn delete(&mut self, id: MediaId) -> Result<(), DataAccessError> {
        let storage_path = self
            .items
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| m.storage_path.clone());

        if let Some(path) = storage_path {
            if let Err(e) = self.storage.remove(&path).await {
                warn!(media_id = %id, path, error = %e, "storage object removal failed; deleting record anyway");
            }
        }

        self.store.delete(id).await?;
        self.items.retain(|m| m.id != id);
        Ok(())
    }

    fn resolve_url(&self, media: &mut Media) {
        if media.public_url.is_none() {
            if let Some(path) = &media.storage_path {
                media.public_url = Some(self.storage.public_url(path));
            }
        }
    }
}
