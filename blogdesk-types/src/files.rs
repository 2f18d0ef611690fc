//! Attachment file references.
//!
//! A file attached to an entry is either already stored on the server
//! (`Remote`) or still sitting on this device (`Local`). Both compare by
//! `FileKey` when attachment snapshots are diffed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ids::AreaId;

/// File identity used to compare attachment snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey {
    pub name: String,
    pub size: u64,
}

/// A file as reported by the web service (`attachmentfiles` items).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub filename: String,
    #[serde(default = "default_filepath")]
    pub filepath: String,
    #[serde(default)]
    pub filesize: u64,
    #[serde(default)]
    pub fileurl: String,
    #[serde(default)]
    pub timemodified: i64,
    #[serde(default)]
    pub mimetype: Option<String>,
}

fn default_filepath() -> String {
    "/".to_string()
}

/// An attachment in an entry's file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileEntry {
    Remote(RemoteFile),
    Local {
        path: PathBuf,
        filename: String,
        filesize: u64,
    },
}

impl FileEntry {
    /// Builds a local entry, taking the file name from the path.
    pub fn local(path: impl Into<PathBuf>, filesize: u64) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::Local {
            path,
            filename,
            filesize,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::Remote(file) => &file.filename,
            Self::Local { filename, .. } => filename,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Self::Remote(file) => file.filesize,
            Self::Local { filesize, .. } => *filesize,
        }
    }

    /// Path on disk for local files.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Remote(_) => None,
            Self::Local { path, .. } => Some(path),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    pub fn key(&self) -> FileKey {
        FileKey {
            name: self.filename().to_string(),
            size: self.size(),
        }
    }
}

impl From<RemoteFile> for FileEntry {
    fn from(file: RemoteFile) -> Self {
        Self::Remote(file)
    }
}

/// Descriptor of files staged on disk for a later upload.
///
/// `online` keeps the files that were already on the server and need no
/// transfer; `offline` counts the files copied into `folder`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFiles {
    pub folder: PathBuf,
    pub online: Vec<FileEntry>,
    pub offline: usize,
}

/// Where the attachments of a save went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentsRef {
    /// Uploaded into a server-side draft area.
    Staged(AreaId),
    /// Stored in the entry's local folder.
    Local(StoredFiles),
}
