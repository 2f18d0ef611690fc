//! Attachment reconciliation.
//!
//! Diffs an entry's attachment snapshots and decides where new files go:
//! into a server-side staging area when the device is online, or into the
//! entry's local folder otherwise.

use crate::error::SyncResult;
use crate::gateway::BlogGateway;
use crate::local_files::LocalFileStore;
use crate::offline::OfflineStore;
use blogdesk_types::{AttachmentsRef, EntryKey, FileEntry, FileKey};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Files to add to and remove from an attachment set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentDelta {
    pub to_add: Vec<FileEntry>,
    pub to_remove: Vec<FileEntry>,
}

impl AttachmentDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Computes which files of `current` are new relative to `initial`, and
/// which files of `initial` are gone from `current`.
///
/// Files compare by [`FileKey`]; input order does not matter and duplicate
/// keys collapse to their first occurrence.
pub fn compute_delta(initial: &[FileEntry], current: &[FileEntry]) -> AttachmentDelta {
    let initial_keys: HashSet<FileKey> = initial.iter().map(FileEntry::key).collect();
    let current_keys: HashSet<FileKey> = current.iter().map(FileEntry::key).collect();

    AttachmentDelta {
        to_add: missing_from(current, &initial_keys),
        to_remove: missing_from(initial, &current_keys),
    }
}

fn missing_from(files: &[FileEntry], other: &HashSet<FileKey>) -> Vec<FileEntry> {
    let mut seen = HashSet::new();
    files
        .iter()
        .filter(|f| {
            let key = f.key();
            !other.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}

/// True when the two lists do not hold the same files.
pub fn are_file_lists_different(a: &[FileEntry], b: &[FileEntry]) -> bool {
    if a.len() != b.len() {
        return true;
    }
    let mut a_keys: Vec<FileKey> = a.iter().map(FileEntry::key).collect();
    let mut b_keys: Vec<FileKey> = b.iter().map(FileEntry::key).collect();
    a_keys.sort();
    b_keys.sort();
    a_keys != b_keys
}

/// Places an entry's files either on the server or on disk.
#[derive(Clone)]
pub struct AttachmentPlacer {
    gateway: Arc<dyn BlogGateway>,
    offline: Arc<dyn OfflineStore>,
    files: LocalFileStore,
}

impl AttachmentPlacer {
    pub fn new(
        gateway: Arc<dyn BlogGateway>,
        offline: Arc<dyn OfflineStore>,
        files: LocalFileStore,
    ) -> Self {
        Self {
            gateway,
            offline,
            files,
        }
    }

    /// Uploads `files` into a new staging area when `online` and not
    /// `force_storage`; otherwise stores them in the folder of `key`.
    ///
    /// The destination is chosen before anything is transferred. Upload
    /// failures keep their kind, so callers can tell a rejection from an
    /// unreachable network.
    pub async fn place_files(
        &self,
        key: &EntryKey,
        files: &[FileEntry],
        online: bool,
        force_storage: bool,
    ) -> SyncResult<AttachmentsRef> {
        let folder = self.offline.folder_path(key);
        self.place_files_in(&folder, files, online, force_storage).await
    }

    /// Like [`place_files`](Self::place_files), with local storage going to
    /// `folder`.
    pub async fn place_files_in(
        &self,
        folder: &Path,
        files: &[FileEntry],
        online: bool,
        force_storage: bool,
    ) -> SyncResult<AttachmentsRef> {
        if online && !force_storage {
            debug!("Uploading {} file(s)", files.len());
            let area = self.gateway.upload_files(None, files).await?;
            return Ok(AttachmentsRef::Staged(area));
        }

        debug!("Storing {} file(s) in {:?}", files.len(), folder);
        let stored = self.files.store_files(folder, files).await?;
        Ok(AttachmentsRef::Local(stored))
    }
}
