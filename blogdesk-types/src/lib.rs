//! Core type definitions for blogdesk.
//!
//! This crate defines the plain data shared by the sync core and the CLI:
//! - Entry identifiers and the `EntryKey` addressing scheme
//! - Server-side blog posts and locally persisted offline drafts
//! - Attachment file references and staging descriptors
//! - Web-service filters and context levels
//!
//! Nothing here performs I/O.

mod context;
mod entry;
mod files;
mod ids;

pub use context::{ContextLevel, EntryContext};
pub use entry::{BlogPost, EntryFilter, EntryOption, OfflineEntry, PublishState, SUMMARY_FORMAT_HTML};
pub use files::{AttachmentsRef, FileEntry, FileKey, RemoteFile, StoredFiles};
pub use ids::{AreaId, EntryId, EntryKey};

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid entry key: {0}")]
    InvalidKey(String),

    #[error("invalid publish state: {0}")]
    InvalidPublishState(String),
}
