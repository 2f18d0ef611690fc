//! Blog entry shapes: server posts, offline drafts, and web-service filters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::files::{FileEntry, RemoteFile, StoredFiles};
use crate::ids::{EntryId, EntryKey};
use crate::Error;

/// Summary format sent with every save (HTML).
pub const SUMMARY_FORMAT_HTML: i32 = 1;

/// Who can see an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    /// Visible to users of the site.
    #[default]
    Site,
    /// Visible to anyone.
    Public,
    /// Visible only to the author.
    Draft,
}

impl PublishState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Site => "site",
            Self::Public => "public",
            Self::Draft => "draft",
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "site" => Ok(Self::Site),
            "public" => Ok(Self::Public),
            "draft" => Ok(Self::Draft),
            other => Err(Error::InvalidPublishState(other.to_string())),
        }
    }
}

/// A `{name, value}` option as accepted by the add/update web services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOption {
    pub name: String,
    pub value: String,
}

impl EntryOption {
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

/// A blog entry as returned by `core_blog_get_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: EntryId,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub userid: i64,
    #[serde(default)]
    pub courseid: i64,
    #[serde(default)]
    pub groupid: i64,
    #[serde(default)]
    pub moduleid: i64,
    #[serde(default)]
    pub coursemoduleid: i64,
    pub subject: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "default_summary_format")]
    pub summaryformat: i32,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub uniquehash: String,
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub format: i32,
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default)]
    pub publishstate: PublishState,
    #[serde(default)]
    pub lastmodified: i64,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub usermodified: Option<i64>,
    #[serde(default)]
    pub summaryfiles: Vec<RemoteFile>,
    #[serde(default)]
    pub attachmentfiles: Vec<RemoteFile>,
}

fn default_summary_format() -> i32 {
    SUMMARY_FORMAT_HTML
}

impl BlogPost {
    pub fn files(&self) -> Vec<FileEntry> {
        self.attachmentfiles
            .iter()
            .cloned()
            .map(FileEntry::Remote)
            .collect()
    }

    /// Associated course, `None` when the server reports 0.
    pub fn course_id(&self) -> Option<i64> {
        non_zero(self.courseid)
    }

    /// Associated course module, `None` when the server reports 0.
    pub fn module_id(&self) -> Option<i64> {
        non_zero(self.coursemoduleid)
    }
}

/// An entry persisted on this device, waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineEntry {
    pub key: EntryKey,
    pub created: i64,
    pub subject: String,
    pub summary: String,
    pub summary_format: i32,
    pub options: Vec<EntryOption>,
    /// Attachments staged in the entry's folder, if the save carried any.
    pub attachments: Option<StoredFiles>,
    pub last_modified: i64,
}

impl OfflineEntry {
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.value.as_str())
    }

    pub fn publish_state(&self) -> PublishState {
        self.option("publishstate")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn course_id(&self) -> Option<i64> {
        self.option("courseassoc")
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(non_zero)
    }

    pub fn module_id(&self) -> Option<i64> {
        self.option("modassoc")
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(non_zero)
    }

    /// Files known to be on the server; local copies are listed from the
    /// entry folder by whoever owns the disk layout.
    pub fn online_files(&self) -> Vec<FileEntry> {
        self.attachments
            .as_ref()
            .map(|a| a.online.clone())
            .unwrap_or_default()
    }
}

fn non_zero(v: i64) -> Option<i64> {
    (v != 0).then_some(v)
}

/// Filter set accepted by `core_blog_get_entries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    pub entryid: Option<EntryId>,
    pub courseid: Option<i64>,
    pub cmid: Option<i64>,
    pub userid: Option<i64>,
    pub groupid: Option<i64>,
    pub tagid: Option<i64>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl EntryFilter {
    /// Filter selecting a single entry.
    pub fn for_entry(id: EntryId) -> Self {
        Self {
            entryid: Some(id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_pairs().is_empty()
    }

    /// Renders the set fields as `(name, value)` pairs in a stable order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.entryid {
            pairs.push(("entryid", id.to_string()));
        }
        if let Some(v) = self.courseid {
            pairs.push(("courseid", v.to_string()));
        }
        if let Some(v) = self.cmid {
            pairs.push(("cmid", v.to_string()));
        }
        if let Some(v) = self.userid {
            pairs.push(("userid", v.to_string()));
        }
        if let Some(v) = self.groupid {
            pairs.push(("groupid", v.to_string()));
        }
        if let Some(v) = self.tagid {
            pairs.push(("tagid", v.to_string()));
        }
        if let Some(v) = &self.tag {
            pairs.push(("tag", v.clone()));
        }
        if let Some(v) = &self.search {
            pairs.push(("search", v.clone()));
        }
        pairs
    }
}
