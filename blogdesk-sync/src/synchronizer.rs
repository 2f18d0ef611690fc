//! Background push of offline drafts.
//!
//! Drafts blocked by an open edit session are skipped. A draft the service
//! rejects can never be sent, so it is discarded with a warning; a draft
//! that hits a transport failure stays for the next run.

use crate::error::SyncResult;
use crate::events::{EditEvent, EventBus};
use crate::fetch::{fetch_entry, FetchRequest};
use crate::gateway::{BlogGateway, EntryDraft};
use crate::local_files::LocalFileStore;
use crate::lock::LockRegistry;
use crate::offline::OfflineStore;
use crate::reconciler::compute_delta;
use blogdesk_types::{AreaId, AttachmentsRef, EntryId, EntryKey, FileEntry, OfflineEntry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a synchronization run did with each draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: Vec<(EntryKey, EntryId)>,
    pub discarded: Vec<EntryKey>,
    pub skipped: Vec<EntryKey>,
    pub failed: Vec<EntryKey>,
    pub warnings: Vec<String>,
}

impl SyncReport {
    pub fn updated(&self) -> bool {
        !self.synced.is_empty() || !self.discarded.is_empty()
    }
}

/// Sends every stored draft to the server.
pub struct DraftSynchronizer {
    gateway: Arc<dyn BlogGateway>,
    offline: Arc<dyn OfflineStore>,
    locks: LockRegistry,
    files: LocalFileStore,
    events: EventBus,
    component: String,
}

impl DraftSynchronizer {
    pub fn new(
        gateway: Arc<dyn BlogGateway>,
        offline: Arc<dyn OfflineStore>,
        locks: LockRegistry,
        files: LocalFileStore,
        events: EventBus,
        component: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            offline,
            locks,
            files,
            events,
            component: component.into(),
        }
    }

    /// Pushes all drafts. Only a failure to list the drafts is an error;
    /// per-draft problems end up in the report.
    pub async fn sync_all(&self) -> SyncResult<SyncReport> {
        let drafts = self.offline.list().await?;
        info!("Synchronizing {} offline draft(s)", drafts.len());

        let mut report = SyncReport::default();
        for draft in drafts {
            let key = draft.key;
            let Ok(guard) = self.locks.block(&self.component, key) else {
                debug!("Draft {} is being edited; skipping", key);
                report.skipped.push(key);
                continue;
            };

            match self.sync_draft(&draft).await {
                Ok(id) => {
                    self.discard(&key).await;
                    report.synced.push((key, id));
                }
                Err(e) if e.is_service_rejection() => {
                    warn!("Discarding draft {}: {}", key, e);
                    self.discard(&key).await;
                    report.warnings.push(format!(
                        "The entry \"{}\" could not be sent and was discarded: {}",
                        draft.subject,
                        e.user_message().unwrap_or("rejected by the site")
                    ));
                    report.discarded.push(key);
                }
                Err(e) => {
                    warn!("Draft {} stays offline: {}", key, e);
                    report.failed.push(key);
                }
            }
            guard.release();
        }

        if report.updated() {
            self.events.emit(EditEvent::EntryUpdated);
        }
        Ok(report)
    }

    async fn sync_draft(&self, draft: &OfflineEntry) -> SyncResult<EntryId> {
        let mut entry = EntryDraft::new(draft.subject.clone(), draft.summary.clone());
        entry.summary_format = draft.summary_format;
        entry.publish_state = draft.publish_state();
        entry.course_id = draft.course_id();
        entry.module_id = draft.module_id();

        if let Some(stored) = &draft.attachments {
            let files = self.files.resolve(stored).await?;
            entry.attachments = match draft.key {
                EntryKey::Identified(id) => Some(AttachmentsRef::Staged(
                    self.stage_for_update(id, &files).await?,
                )),
                EntryKey::Pending(_) if files.is_empty() => None,
                EntryKey::Pending(_) => Some(AttachmentsRef::Staged(
                    self.gateway.upload_files(None, &files).await?,
                )),
            };
        }

        match draft.key {
            EntryKey::Pending(created) => self.gateway.create(&entry, created).await,
            EntryKey::Identified(id) => {
                self.gateway.update(id, &entry).await?;
                Ok(id)
            }
        }
    }

    /// Brings the entry's draft area in line with `files`.
    async fn stage_for_update(&self, id: EntryId, files: &[FileEntry]) -> SyncResult<AreaId> {
        let area = self.gateway.prepare_staging_area(id).await?;
        let current = fetch_entry(self.gateway.as_ref(), &FetchRequest::new(id)).await?;
        let delta = compute_delta(&current.files(), files);

        if !delta.to_remove.is_empty() {
            self.gateway.delete_files(area, &delta.to_remove).await?;
        }
        if !delta.to_add.is_empty() {
            self.gateway.upload_files(Some(area), &delta.to_add).await?;
        }
        Ok(area)
    }

    async fn discard(&self, key: &EntryKey) {
        if let Err(e) = self.offline.delete(key).await {
            warn!("Failed to delete offline draft {}: {}", key, e);
        }
        let folder = self.offline.folder_path(key);
        if let Err(e) = self.files.remove_folder(&folder).await {
            warn!("Failed to remove files of draft {}: {}", key, e);
        }
    }
}
