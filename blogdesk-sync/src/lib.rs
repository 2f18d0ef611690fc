//! Blog entry editing with offline fallback.
//!
//! Saves go to the site when it can be reached and are staged on this
//! device when it cannot. Staged drafts are pushed later by the
//! [`DraftSynchronizer`].
//!
//! ## Components
//!
//! - **Gateway**: the remote blog service ([`MoodleGateway`] over REST)
//! - **Offline store**: drafts in SQLite, attachments in per-entry folders
//! - **Reconciler**: attachment deltas and file placement
//! - **Session**: one open editor, from load to save
//! - **Synchronizer**: background push of stored drafts
//!
//! ## Save flow
//!
//! 1. Validate the form (subject and summary are required)
//! 2. New entries: place files, then create
//! 3. Existing entries: stage the attachment delta, then update
//! 4. A transport failure stores the entry offline instead
//! 5. A service rejection is shown to the user and never stored
//!
//! # Example
//!
//! ```
//! use blogdesk_sync::{LockRegistry, SessionConfig};
//!
//! let locks = LockRegistry::new();
//! let config = SessionConfig::default();
//! let guard = locks.block(&config.component, "42").unwrap();
//! assert!(locks.is_blocked(&config.component, "42"));
//! guard.release();
//! ```

pub mod connectivity;
mod error;
pub mod events;
pub mod fetch;
pub mod gateway;
pub mod local_files;
pub mod lock;
pub mod moodle;
pub mod offline;
pub mod reconciler;
pub mod session;
pub mod synchronizer;
pub mod ui;

pub use connectivity::{Connectivity, NetworkStatus};
pub use error::{SyncError, SyncResult};
pub use events::{EditEvent, EventBus};
pub use fetch::{fetch_entry, FetchRequest};
pub use gateway::{BlogGateway, EntryDraft};
pub use local_files::LocalFileStore;
pub use lock::{LockRegistry, OperationGuard};
pub use moodle::{MoodleConfig, MoodleGateway};
pub use offline::{OfflineStore, SqliteOfflineStore};
pub use reconciler::{are_file_lists_different, compute_delta, AttachmentDelta, AttachmentPlacer};
pub use session::{
    EditSession, EntryForm, OpenRequest, SaveOutcome, SessionConfig, SessionDeps,
    DISCARD_CHANGES_PROMPT,
};
pub use synchronizer::{DraftSynchronizer, SyncReport};
pub use ui::EditorUi;
