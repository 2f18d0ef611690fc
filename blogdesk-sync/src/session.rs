//! Entry edit sessions.
//!
//! An [`EditSession`] loads one entry, blocks it for the duration of the
//! edit, and turns every save into exactly one outcome: synced online or
//! staged offline. Service rejections are reported to the user and never
//! turned into drafts; only transport failures fall back to offline storage.

use crate::connectivity::Connectivity;
use crate::error::{SyncError, SyncResult};
use crate::events::{EditEvent, EventBus};
use crate::fetch::{fetch_entry, FetchRequest};
use crate::gateway::{BlogGateway, EntryDraft};
use crate::local_files::LocalFileStore;
use crate::lock::{LockRegistry, OperationGuard};
use crate::offline::OfflineStore;
use crate::reconciler::{are_file_lists_different, compute_delta, AttachmentPlacer};
use crate::ui::EditorUi;
use blogdesk_types::{
    AttachmentsRef, BlogPost, EntryContext, EntryFilter, EntryId, EntryKey, FileEntry,
    OfflineEntry, PublishState, SUMMARY_FORMAT_HTML,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prompt shown when leaving with unsaved changes.
pub const DISCARD_CHANGES_PROMPT: &str = "Are you sure you want to discard your changes?";

const CREATE_FAILED: &str = "Error creating entry.";
const UPDATE_FAILED: &str = "Error updating entry.";

/// Per-site settings of the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Site the session edits on; carried by form events.
    pub site_id: String,
    /// Lock namespace shared with the draft synchronizer.
    pub component: String,
    /// The site's front page course, which counts as the system context.
    pub site_home_id: Option<i64>,
    /// Maximum number of attachments per entry.
    pub max_files: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            site_id: "default".to_string(),
            component: "blog".to_string(),
            site_home_id: Some(1),
            max_files: 99,
        }
    }
}

/// Collaborators of an edit session.
#[derive(Clone)]
pub struct SessionDeps {
    pub gateway: Arc<dyn BlogGateway>,
    pub offline: Arc<dyn OfflineStore>,
    pub locks: LockRegistry,
    pub connectivity: Arc<dyn Connectivity>,
    pub files: LocalFileStore,
    pub ui: Arc<dyn EditorUi>,
    pub events: EventBus,
    pub config: SessionConfig,
}

/// Which entry to open, and where the user came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenRequest {
    /// `None` starts a new entry.
    pub key: Option<EntryKey>,
    /// Filters of the list the entry was picked from.
    pub filters: Option<EntryFilter>,
    /// Last-modified time that list showed.
    pub last_modified: Option<i64>,
    pub course_id: Option<i64>,
    pub cm_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl OpenRequest {
    pub fn new_entry() -> Self {
        Self::default()
    }

    pub fn edit(key: EntryKey) -> Self {
        Self {
            key: Some(key),
            ..Default::default()
        }
    }

    pub fn with_course(mut self, course_id: i64) -> Self {
        self.course_id = Some(course_id);
        self
    }

    pub fn with_module(mut self, cm_id: i64) -> Self {
        self.cm_id = Some(cm_id);
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_list_context(mut self, filters: EntryFilter, last_modified: Option<i64>) -> Self {
        self.filters = Some(filters);
        self.last_modified = last_modified;
        self
    }
}

/// Editable fields of the entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryForm {
    pub subject: String,
    pub summary: String,
    pub publish_state: PublishState,
    pub associate_with_course: bool,
    pub associate_with_module: bool,
}

/// The entry as it was when the session opened.
#[derive(Debug, Clone)]
struct LoadedEntry {
    subject: String,
    summary: String,
    publish_state: PublishState,
    course_id: Option<i64>,
    module_id: Option<i64>,
    created: i64,
    /// Loaded from a draft that still holds attachments to send.
    staged_attachments: bool,
}

impl From<&BlogPost> for LoadedEntry {
    fn from(post: &BlogPost) -> Self {
        Self {
            subject: post.subject.clone(),
            summary: post.summary.clone(),
            publish_state: post.publishstate,
            course_id: post.course_id(),
            module_id: post.module_id(),
            created: post.created,
            staged_attachments: false,
        }
    }
}

impl From<&OfflineEntry> for LoadedEntry {
    fn from(draft: &OfflineEntry) -> Self {
        Self {
            subject: draft.subject.clone(),
            summary: draft.summary.clone(),
            publish_state: draft.publish_state(),
            course_id: draft.course_id(),
            module_id: draft.module_id(),
            created: draft.created,
            staged_attachments: draft.attachments.is_some(),
        }
    }
}

/// Result of [`EditSession::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The server confirmed the entry.
    Synced(EntryId),
    /// The entry was queued on this device for a later sync.
    StagedOffline(EntryKey),
    /// The service refused the entry; the message was shown to the user.
    Rejected(String),
    /// Neither the online nor the offline path succeeded.
    Failed(String),
    /// Subject or summary is empty; nothing was attempted.
    Invalid,
}

/// One open entry editor.
pub struct EditSession {
    deps: SessionDeps,
    placer: AttachmentPlacer,
    key: EntryKey,
    created: i64,
    loaded: Option<LoadedEntry>,
    form: EntryForm,
    initial_files: Vec<FileEntry>,
    files: Vec<FileEntry>,
    staged_attachments: bool,
    course_id: Option<i64>,
    module_id: Option<i64>,
    user_id: Option<i64>,
    filters: Option<EntryFilter>,
    last_modified: Option<i64>,
    guard: Option<OperationGuard>,
    force_leave: bool,
}

impl EditSession {
    /// Opens the entry named by `request` and blocks it until the session
    /// finishes or is dropped.
    ///
    /// Existing entries prefer their offline draft over the server copy.
    /// Offline-only entries must still have a draft.
    pub async fn open(deps: SessionDeps, request: OpenRequest) -> SyncResult<Self> {
        let (key, loaded, files) = match request.key {
            None => (EntryKey::Pending(Utc::now().timestamp()), None, Vec::new()),
            Some(key) => {
                let (loaded, files) = Self::load(&deps, key, &request).await?;
                (key, Some(loaded), files)
            }
        };

        let guard = deps.locks.block(&deps.config.component, key)?;

        let course_id = request
            .course_id
            .or(loaded.as_ref().and_then(|l| l.course_id));
        let module_id = request
            .cm_id
            .or(loaded.as_ref().and_then(|l| l.module_id));

        let created = match (&loaded, key) {
            (Some(entry), _) => entry.created,
            (None, EntryKey::Pending(created)) => created,
            (None, EntryKey::Identified(_)) => Utc::now().timestamp(),
        };

        let form = EntryForm {
            subject: loaded.as_ref().map(|l| l.subject.clone()).unwrap_or_default(),
            summary: loaded.as_ref().map(|l| l.summary.clone()).unwrap_or_default(),
            publish_state: loaded.as_ref().map(|l| l.publish_state).unwrap_or_default(),
            associate_with_course: course_id.is_some(),
            associate_with_module: module_id.is_some(),
        };

        let placer = AttachmentPlacer::new(
            deps.gateway.clone(),
            deps.offline.clone(),
            deps.files.clone(),
        );

        debug!("Opened edit session for entry {}", key);
        Ok(Self {
            placer,
            key,
            created,
            staged_attachments: loaded.as_ref().is_some_and(|l| l.staged_attachments),
            loaded,
            form,
            initial_files: files.clone(),
            files,
            course_id,
            module_id,
            user_id: request.user_id,
            filters: request.filters,
            last_modified: request.last_modified,
            guard: Some(guard),
            force_leave: false,
            deps,
        })
    }

    async fn load(
        deps: &SessionDeps,
        key: EntryKey,
        request: &OpenRequest,
    ) -> SyncResult<(LoadedEntry, Vec<FileEntry>)> {
        if let Some(draft) = deps.offline.get(&key).await? {
            let mut files = draft.online_files();
            files.extend(deps.files.stored_files(&deps.offline.folder_path(&key)).await?);
            return Ok((LoadedEntry::from(&draft), files));
        }

        match key {
            EntryKey::Pending(_) => Err(SyncError::NotFound(
                "This offline entry no longer exists.".to_string(),
            )),
            EntryKey::Identified(entry_id) => {
                let fetch = FetchRequest {
                    entry_id,
                    filters: request.filters.clone(),
                    last_modified: request.last_modified,
                };
                let post = fetch_entry(deps.gateway.as_ref(), &fetch).await?;
                Ok((LoadedEntry::from(&post), post.files()))
            }
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn key(&self) -> EntryKey {
        self.key
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    /// True for entries that so far only exist on this device.
    pub fn is_offline_entry(&self) -> bool {
        self.loaded.is_some() && self.key.is_pending()
    }

    pub fn form(&self) -> &EntryForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut EntryForm {
        &mut self.form
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn initial_files(&self) -> &[FileEntry] {
        &self.initial_files
    }

    /// Attaches a file unless the entry is already at its file limit.
    pub fn add_file(&mut self, file: FileEntry) -> bool {
        if self.files.len() >= self.deps.config.max_files {
            return false;
        }
        self.files.push(file);
        true
    }

    pub fn remove_file(&mut self, index: usize) -> Option<FileEntry> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn course_id(&self) -> Option<i64> {
        self.course_id
    }

    pub fn module_id(&self) -> Option<i64> {
        self.module_id
    }

    pub fn context(&self) -> EntryContext {
        EntryContext::resolve(
            self.user_id,
            self.course_id,
            self.module_id,
            self.deps.config.site_home_id,
        )
    }

    // ── Dirty checking ───────────────────────────────────────────

    pub fn has_data_changed(&self) -> bool {
        if self.loaded.is_some() {
            self.has_data_changed_for_edit()
        } else {
            self.has_data_changed_for_new_entry()
        }
    }

    /// Compares the form against the entry as loaded.
    pub fn has_data_changed_for_edit(&self) -> bool {
        let Some(entry) = &self.loaded else {
            return true;
        };
        self.form.summary != entry.summary
            || self.form.subject != entry.subject
            || self.form.publish_state != entry.publish_state
            || are_file_lists_different(&self.files, &self.initial_files)
            || self.form.associate_with_module != entry.module_id.is_some()
            || self.form.associate_with_course != entry.course_id.is_some()
    }

    /// Compares the form against an empty entry.
    pub fn has_data_changed_for_new_entry(&self) -> bool {
        !self.form.subject.is_empty()
            || !self.form.summary.is_empty()
            || self.form.publish_state != PublishState::default()
            || are_file_lists_different(&self.files, &self.initial_files)
    }

    /// Asks before abandoning unsaved changes. Returns false if the user
    /// chose to stay.
    pub async fn can_leave(&self) -> bool {
        if self.force_leave {
            return true;
        }

        if self.has_data_changed() && !self.deps.ui.confirm(DISCARD_CHANGES_PROMPT).await {
            return false;
        }

        self.deps.events.emit(EditEvent::FormCancelled {
            site_id: self.deps.config.site_id.clone(),
        });
        true
    }

    // ── Saving ───────────────────────────────────────────────────

    /// Saves the entry. Never fails: problems are shown through the UI and
    /// reflected in the returned outcome.
    pub async fn save(&mut self) -> SaveOutcome {
        if self.form.subject.trim().is_empty() || self.form.summary.trim().is_empty() {
            return SaveOutcome::Invalid;
        }

        let fallback_message = if self.key.is_pending() {
            CREATE_FAILED
        } else {
            UPDATE_FAILED
        };

        let attempt = match self.key {
            EntryKey::Identified(id) => self.save_existing(id).await,
            EntryKey::Pending(_) => self.save_new().await,
        };

        let error = match attempt {
            Ok(outcome) => return outcome,
            Err(e) => e,
        };

        if !error.is_transport_failure() {
            return self.report(error, fallback_message).await;
        }

        warn!("Could not save entry {} online ({}); storing it offline", self.key, error);
        match self.save_offline().await {
            Ok(outcome) => outcome,
            Err(e) => self.report(e, fallback_message).await,
        }
    }

    async fn save_new(&mut self) -> SyncResult<SaveOutcome> {
        if self.files.is_empty() {
            return self.save_direct(None).await;
        }

        let online = self.deps.connectivity.is_online();
        let attachments = self
            .placer
            .place_files(&self.key, &self.files, online, false)
            .await?;
        self.save_direct(Some(attachments)).await
    }

    async fn save_existing(&mut self, id: EntryId) -> SyncResult<SaveOutcome> {
        if !self.deps.connectivity.is_online() {
            // Only an offline save may replace the draft's own folder.
            let scratch = self
                .deps
                .files
                .pending_folder(&self.deps.offline.folder_path(&self.key));
            let placed = self
                .placer
                .place_files_in(&scratch, &self.files, false, true)
                .await;
            let result = match placed {
                Ok(attachments) => self.save_direct(Some(attachments)).await,
                Err(e) => Err(e),
            };
            if let Err(e) = self.deps.files.remove_folder(&scratch).await {
                warn!("Failed to remove {:?}: {}", scratch, e);
            }
            return result;
        }

        if !self.staged_attachments && !are_file_lists_different(&self.files, &self.initial_files) {
            return self.save_direct(None).await;
        }

        let gateway = self.deps.gateway.clone();
        let area = gateway.prepare_staging_area(id).await?;

        // The server copy may have changed since the entry was loaded.
        let fetch = FetchRequest {
            entry_id: id,
            filters: self.filters.clone(),
            last_modified: self.last_modified,
        };
        let current = fetch_entry(gateway.as_ref(), &fetch).await?;

        let delta = compute_delta(&current.files(), &self.files);
        if delta.is_empty() {
            debug!("Entry {} attachments already match the server", id);
        }
        debug!(
            "Entry {} attachments: {} to add, {} to remove",
            id,
            delta.to_add.len(),
            delta.to_remove.len()
        );

        // Deletions first so re-added names do not collide in the area.
        if !delta.to_remove.is_empty() {
            gateway.delete_files(area, &delta.to_remove).await?;
        }
        if !delta.to_add.is_empty() {
            gateway.upload_files(Some(area), &delta.to_add).await?;
        }

        self.save_direct(Some(AttachmentsRef::Staged(area))).await
    }

    /// Creates or updates the entry on the server. Nothing after the remote
    /// call is allowed to fail the save.
    async fn save_direct(&mut self, attachments: Option<AttachmentsRef>) -> SyncResult<SaveOutcome> {
        let draft = self.draft(attachments);
        let previous = self.key;

        let id = match previous {
            EntryKey::Pending(created) => self.deps.gateway.create(&draft, created).await?,
            EntryKey::Identified(id) => {
                self.deps.gateway.update(id, &draft).await?;
                id
            }
        };
        info!("Saved entry {} online", id);

        self.key = EntryKey::Identified(id);
        self.discard_offline_copy(&previous).await;
        self.initial_files = self.files.clone();
        self.staged_attachments = false;
        self.finish().await;
        Ok(SaveOutcome::Synced(id))
    }

    /// Stores the entry and its files on this device.
    async fn save_offline(&mut self) -> SyncResult<SaveOutcome> {
        let online = self.deps.connectivity.is_online();
        let stored = match self
            .placer
            .place_files(&self.key, &self.files, online, true)
            .await?
        {
            AttachmentsRef::Local(stored) => stored,
            AttachmentsRef::Staged(area) => {
                return Err(SyncError::Storage(format!(
                    "attachments went to staging area {area} instead of local storage"
                )));
            }
        };

        let draft = self.draft(None);
        let entry = OfflineEntry {
            key: self.key,
            created: self.created,
            options: draft.options(),
            subject: draft.subject,
            summary: draft.summary,
            summary_format: draft.summary_format,
            attachments: Some(stored),
            last_modified: Utc::now().timestamp(),
        };
        self.deps.offline.save(&entry).await?;
        info!("Stored entry {} offline", self.key);

        self.staged_attachments = true;
        self.finish().await;
        Ok(SaveOutcome::StagedOffline(self.key))
    }

    fn draft(&self, attachments: Option<AttachmentsRef>) -> EntryDraft {
        EntryDraft {
            subject: self.form.subject.clone(),
            summary: self.form.summary.clone(),
            summary_format: SUMMARY_FORMAT_HTML,
            publish_state: self.form.publish_state,
            course_id: self.course_id.filter(|_| self.form.associate_with_course),
            module_id: self.module_id.filter(|_| self.form.associate_with_module),
            attachments,
        }
    }

    /// Drops any draft left for `key` once the server has the entry.
    async fn discard_offline_copy(&self, key: &EntryKey) {
        if let Err(e) = self.deps.offline.delete(key).await {
            warn!("Failed to delete offline draft {}: {}", key, e);
        }
        let folder = self.deps.offline.folder_path(key);
        if let Err(e) = self.deps.files.remove_folder(&folder).await {
            warn!("Failed to remove files of entry {}: {}", key, e);
        }
    }

    async fn finish(&mut self) {
        self.deps.events.emit(EditEvent::EntryUpdated);
        self.force_leave = true;
        self.deps.events.emit(EditEvent::FormSubmitted {
            site_id: self.deps.config.site_id.clone(),
        });
        if let Some(guard) = self.guard.take() {
            guard.release();
        }
        self.deps.ui.navigate_back().await;
    }

    async fn report(&self, error: SyncError, fallback: &str) -> SaveOutcome {
        let message = error.user_message().unwrap_or(fallback).to_string();
        warn!("Saving entry {} failed: {}", self.key, error);
        self.deps.ui.show_error(&message).await;

        if error.is_service_rejection() {
            SaveOutcome::Rejected(message)
        } else {
            SaveOutcome::Failed(error.to_string())
        }
    }
}
