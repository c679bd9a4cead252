//! Media records and gallery filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keepsake_core::{EventId, MediaId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
    Note,
}

/// Gallery tab filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaFilter {
    #[default]
    All,
    Kind(MediaKind),
}

impl MediaFilter {
    pub fn matches(&self, media: &Media) -> bool {
        match self {
            MediaFilter::All => true,
            MediaFilter::Kind(kind) => media.kind == *kind,
        }
    }
}

/// One uploaded item. Notes carry `note_content` and no storage object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: MediaId,
    pub event_id: EventId,
    pub kind: MediaKind,
    pub storage_path: Option<String>,
    pub file_name: Option<String>,
    pub file_size_bytes: u64,
    pub mime_type: Option<String>,
    pub uploader_name: Option<String>,
    pub note_content: Option<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    /// Derived from `storage_path` at read time; not persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}
