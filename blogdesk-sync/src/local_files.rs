//! On-device staging of attachment files.
//!
//! Files that cannot be uploaded yet are copied into a per-entry folder so
//! the originals can go away. The folder is later read back when the entry
//! is synced.

use crate::error::SyncResult;
use blogdesk_types::{FileEntry, StoredFiles};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Copies attachments into entry folders and lists them back.
#[derive(Debug, Clone, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }

    /// Replaces the contents of `folder` with the local files in `files`.
    ///
    /// Remote files are not copied; they are kept in the descriptor's
    /// `online` list. Local files whose names clash get a numbered suffix.
    /// Sources may live inside `folder` itself (a draft being staged again),
    /// so everything is copied aside before the old folder is removed.
    pub async fn store_files(&self, folder: &Path, files: &[FileEntry]) -> SyncResult<StoredFiles> {
        let staging = sibling_path(folder, "staging");
        if fs::try_exists(&staging).await? {
            fs::remove_dir_all(&staging).await?;
        }
        fs::create_dir_all(&staging).await?;

        let (online, offline) = match copy_into(&staging, files).await {
            Ok(copied) => copied,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&staging).await {
                    warn!("Failed to clean up {:?}: {}", staging, cleanup);
                }
                return Err(e);
            }
        };

        if fs::try_exists(folder).await? {
            fs::remove_dir_all(folder).await?;
        }
        fs::rename(&staging, folder).await?;

        info!("Stored {} file(s) in {:?}", offline, folder);
        Ok(StoredFiles {
            folder: folder.to_path_buf(),
            online,
            offline,
        })
    }

    /// Scratch folder next to `folder`, for files that must not replace a
    /// draft's own.
    pub fn pending_folder(&self, folder: &Path) -> PathBuf {
        sibling_path(folder, "pending")
    }

    /// Lists the files staged in `folder`, sorted by name. A missing folder
    /// has no files.
    pub async fn stored_files(&self, folder: &Path) -> SyncResult<Vec<FileEntry>> {
        if !fs::try_exists(folder).await? {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut dir = fs::read_dir(folder).await?;
        while let Some(item) = dir.next_entry().await? {
            let metadata = item.metadata().await?;
            if metadata.is_file() {
                files.push(FileEntry::local(item.path(), metadata.len()));
            }
        }
        files.sort_by(|a, b| a.filename().cmp(b.filename()));
        Ok(files)
    }

    /// Every file a stored descriptor stands for: the remote ones it kept
    /// plus whatever sits in its folder.
    pub async fn resolve(&self, stored: &StoredFiles) -> SyncResult<Vec<FileEntry>> {
        let mut files = stored.online.clone();
        files.extend(self.stored_files(&stored.folder).await?);
        Ok(files)
    }

    pub async fn remove_folder(&self, folder: &Path) -> SyncResult<()> {
        if fs::try_exists(folder).await? {
            fs::remove_dir_all(folder).await?;
            debug!("Removed entry folder {:?}", folder);
        }
        Ok(())
    }
}

async fn copy_into(dir: &Path, files: &[FileEntry]) -> SyncResult<(Vec<FileEntry>, usize)> {
    let mut online = Vec::new();
    let mut taken = HashSet::new();
    for file in files {
        match file {
            FileEntry::Remote(_) => online.push(file.clone()),
            FileEntry::Local { path, filename, .. } => {
                let name = unique_name(filename, &mut taken);
                if name != *filename {
                    debug!("Storing {:?} as {} to keep names unique", path, name);
                }
                fs::copy(path, dir.join(&name)).await?;
            }
        }
    }
    Ok((online, taken.len()))
}

/// Returns `filename`, or `stem (n).ext` for the first `n` not yet taken.
fn unique_name(filename: &str, taken: &mut HashSet<String>) -> String {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };
    let mut name = filename.to_string();
    let mut n = 1;
    while !taken.insert(name.clone()) {
        name = match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        n += 1;
    }
    name
}

fn sibling_path(folder: &Path, suffix: &str) -> PathBuf {
    let mut name = folder.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    folder.with_file_name(name)
}
