//! Authoritative entry fetch with stale-cache detection.

use crate::error::{SyncError, SyncResult};
use crate::gateway::BlogGateway;
use blogdesk_types::{BlogPost, EntryFilter, EntryId};
use tracing::{debug, warn};

/// What to fetch, plus what the caller already knows about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub entry_id: EntryId,
    /// Filters of the list view the entry was opened from.
    pub filters: Option<EntryFilter>,
    /// Last-modified time the list view showed for the entry.
    pub last_modified: Option<i64>,
}

impl FetchRequest {
    pub fn new(entry_id: EntryId) -> Self {
        Self {
            entry_id,
            filters: None,
            last_modified: None,
        }
    }
}

/// Fetches the current server copy of an entry.
///
/// The single-entry fetch is tried first. When the caller came from a
/// filtered list (an empty filter set counts as none), a missing or
/// outdated result (or a transport failure) triggers a fetch with those
/// filters. If the entry is not in that list
/// either, an outdated single-entry result is still returned; any other
/// first failure is reported as is. Rejections are never retried.
pub async fn fetch_entry(gateway: &dyn BlogGateway, request: &FetchRequest) -> SyncResult<BlogPost> {
    let id = request.entry_id;
    let filters = request.filters.as_ref().filter(|f| !f.is_empty());

    let (error, outdated) = match gateway.fetch_by_id(id).await {
        Ok(posts) => match posts.into_iter().find(|p| p.id == id) {
            None => (SyncError::NotFound(format!("entry {id}")), None),
            Some(post) => match (filters, request.last_modified) {
                (Some(_), Some(expected)) if post.lastmodified < expected => (
                    SyncError::Stale {
                        entry_id: id,
                        last_modified: post.lastmodified,
                        expected,
                    },
                    Some(post),
                ),
                _ => return Ok(post),
            },
        },
        Err(e) => (e, None),
    };

    let Some(filters) = filters else {
        return Err(error);
    };
    if error.is_service_rejection() {
        return Err(error);
    }

    debug!("Refetching entry {} with list filters after: {}", id, error);
    let listed = gateway.fetch_by_filter(filters).await?;
    if let Some(post) = listed.into_iter().find(|p| p.id == id) {
        return Ok(post);
    }

    match outdated {
        Some(post) => {
            warn!("Entry {} missing from filtered list; using outdated copy", id);
            Ok(post)
        }
        None => Err(error),
    }
}
