//! In-memory media rows, object storage, and change feed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock, mpsc};

use async_trait::async_trait;

use keepsake_core::{DataAccessError, EventId, MediaId};
use keepsake_media::{
    Media, MediaChange, MediaChangeFeed, MediaFilter, MediaStore, MediaSubscription,
    ObjectStorage, StorageError,
};

/// In-memory fan-out of media changes, scoped per event.
///
/// Best-effort delivery; dead subscribers are dropped while publishing.
#[derive(Debug, Default)]
pub struct InMemoryMediaFeed {
    senders: Mutex<Vec<(EventId, mpsc::Sender<MediaChange>)>>,
}

impl InMemoryMediaFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, event_id: EventId, change: MediaChange) {
        if let Ok(mut senders) = self.senders.lock() {
            senders.retain(|(id, tx)| *id != event_id || tx.send(change.clone()).is_ok());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl MediaChangeFeed for InMemoryMediaFeed {
    fn subscribe(&self, event_id: EventId) -> MediaSubscription {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push((event_id, tx));
        }
        MediaSubscription::new(rx)
    }
}

/// In-memory media rows. Inserts and deletes publish to the feed the same
/// way the hosted backend's realtime channel does.
#[derive(Debug)]
pub struct InMemoryMediaStore {
    rows: RwLock<Vec<Media>>,
    feed: Arc<InMemoryMediaFeed>,
}

impl Default for InMemoryMediaStore {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryMediaFeed::new()))
    }
}

impl InMemoryMediaStore {
    pub fn new(feed: Arc<InMemoryMediaFeed>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            feed,
        }
    }

    pub fn feed(&self) -> Arc<InMemoryMediaFeed> {
        self.feed.clone()
    }

    /// Insert a row and publish the change, like a guest upload landing.
    pub fn insert(&self, media: Media) {
        if let Ok(mut rows) = self.rows.write() {
            rows.push(media.clone());
        }
        self.feed.publish(media.event_id, MediaChange::Inserted(media));
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn list_for_event(
        &self,
        event_id: EventId,
        filter: MediaFilter,
    ) -> Result<Vec<Media>, DataAccessError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DataAccessError::read("lock poisoned"))?;
        let mut out: Vec<Media> = rows
            .iter()
            .filter(|m| m.event_id == event_id && filter.matches(m))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn delete(&self, id: MediaId) -> Result<(), DataAccessError> {
        let event_id = {
            let mut rows = self
                .rows
                .write()
                .map_err(|_| DataAccessError::write("lock poisoned"))?;
            let Some(pos) = rows.iter().position(|m| m.id == id) else {
                return Err(DataAccessError::write("no such media record"));
            };
            rows.remove(pos).event_id
        };
        self.feed.publish(event_id, MediaChange::Deleted(id));
        Ok(())
    }
}

/// In-memory blob store keyed by object path.
#[derive(Debug)]
pub struct InMemoryObjectStorage {
    base_url: String,
    objects: Mutex<HashSet<String>>,
}

impl InMemoryObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(HashSet::new()),
        }
    }

    pub fn put(&self, path: impl Into<String>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(path.into());
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().map(|o| o.contains(path)).unwrap_or(false)
    }
}

impl Default for InMemoryObjectStorage {
    fn default() -> Self {
        Self::new("https://cdn.keepsake.example")
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError("lock poisoned".to_string()))?;
        if objects.remove(path) {
            Ok(())
        } else {
            Err(StorageError(format!("object not found: {path}")))
        }
    }
}
