//! `keepsake-media` — the gallery's local mirror of uploaded guest media.
//!
//! Media rows are written by the guest upload path (out of scope here); this
//! crate reads them, mirrors them locally, and keeps the mirror live via a
//! change feed.

pub mod feed;
pub mod media;
pub mod store;
pub mod sync;

pub use feed::{MediaChange, MediaChangeFeed, MediaSubscription};
pub use media::{Media, MediaFilter, MediaKind};
pub use store::{MediaStore, ObjectStorage, StorageError};
pub use sync::MediaSynchronizer;
