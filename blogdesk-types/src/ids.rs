//! Identifier types for blog entries and server-side file areas.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned identifier of a blog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(i64);

impl EntryId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a server-side draft file area (the "staging area").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(i64);

impl AreaId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an entry is addressed.
///
/// Entries confirmed by the server are `Identified`. Entries that only exist
/// on this device are `Pending` and keyed by their creation timestamp
/// (seconds since the epoch) until the first successful online save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKey {
    Identified(EntryId),
    Pending(i64),
}

impl EntryKey {
    /// Returns the server id, if the entry has one.
    #[must_use]
    pub const fn entry_id(&self) -> Option<EntryId> {
        match self {
            Self::Identified(id) => Some(*id),
            Self::Pending(_) => None,
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl From<EntryId> for EntryKey {
    fn from(id: EntryId) -> Self {
        Self::Identified(id)
    }
}

/// `Identified` keys render as the bare id, `Pending` keys as `new-<created>`.
impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identified(id) => write!(f, "{id}"),
            Self::Pending(created) => write!(f, "new-{created}"),
        }
    }
}

impl FromStr for EntryKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidKey(s.to_string());

        if let Some(created) = s.strip_prefix("new-") {
            let created = created.parse::<i64>().map_err(|_| invalid())?;
            return Ok(Self::Pending(created));
        }

        let id = s.parse::<i64>().map_err(|_| invalid())?;
        if id <= 0 {
            return Err(invalid());
        }
        Ok(Self::Identified(EntryId::new(id)))
    }
}
