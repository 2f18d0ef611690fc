//! Commands of the `blogdesk` binary, on top of the sync layer.

use crate::config::AppConfig;
use anyhow::{bail, Context, Result};
use blogdesk_sync::{
    BlogGateway, DraftSynchronizer, EditSession, EditorUi, EventBus, LocalFileStore,
    LockRegistry, MoodleGateway, NetworkStatus, OfflineStore, OpenRequest, SaveOutcome,
    SessionConfig, SessionDeps, SqliteOfflineStore, SyncReport,
};
use blogdesk_types::{EntryKey, FileEntry, OfflineEntry, PublishState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Changes requested for an entry. Unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct EntryInput {
    pub subject: Option<String>,
    pub summary: Option<String>,
    pub publish_state: Option<PublishState>,
    pub course_id: Option<i64>,
    pub associate_with_course: Option<bool>,
    pub associate_with_module: Option<bool>,
    /// Files on disk to attach.
    pub attach: Vec<PathBuf>,
    /// Attachment names to remove.
    pub detach: Vec<String>,
}

impl EntryInput {
    async fn apply(&self, session: &mut EditSession) -> Result<()> {
        let form = session.form_mut();
        if let Some(subject) = &self.subject {
            form.subject = subject.clone();
        }
        if let Some(summary) = &self.summary {
            form.summary = summary.clone();
        }
        if let Some(state) = self.publish_state {
            form.publish_state = state;
        }
        if let Some(course) = self.associate_with_course {
            form.associate_with_course = course;
        }
        if let Some(module) = self.associate_with_module {
            form.associate_with_module = module;
        }

        for name in &self.detach {
            let index = session
                .files()
                .iter()
                .position(|f| f.filename() == name)
                .with_context(|| format!("No attachment named {name}"))?;
            session.remove_file(index);
        }

        for path in &self.attach {
            let metadata = tokio::fs::metadata(path)
                .await
                .with_context(|| format!("Cannot attach {}", path.display()))?;
            if !session.add_file(FileEntry::local(path.clone(), metadata.len())) {
                bail!("Attachment limit reached, {} not added", path.display());
            }
        }
        Ok(())
    }
}

/// Wired collaborators shared by every command.
pub struct App {
    deps: SessionDeps,
    network: Arc<NetworkStatus>,
}

impl App {
    /// Connects to the configured site and opens the draft database.
    pub fn open(config: &AppConfig, ui: Arc<dyn EditorUi>) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

        let gateway = MoodleGateway::new(config.moodle.clone())
            .context("Failed to create web service client")?;
        let offline = SqliteOfflineStore::open(config.database_path(), config.files_root())
            .context("Failed to open offline drafts")?;

        info!("Using site {}", config.moodle.site_url);
        Ok(Self::from_parts(
            Arc::new(gateway),
            Arc::new(offline),
            ui,
            config.session.clone(),
        ))
    }

    pub fn from_parts(
        gateway: Arc<dyn BlogGateway>,
        offline: Arc<dyn OfflineStore>,
        ui: Arc<dyn EditorUi>,
        session: SessionConfig,
    ) -> Self {
        let network = Arc::new(NetworkStatus::default());
        let deps = SessionDeps {
            gateway,
            offline,
            locks: LockRegistry::new(),
            connectivity: network.clone(),
            files: LocalFileStore::new(),
            ui,
            events: EventBus::default(),
            config: session,
        };
        Self { deps, network }
    }

    /// Treats the device as offline: attachments stay on disk.
    pub fn set_online(&self, online: bool) {
        self.network.set_online(online);
    }

    pub fn events(&self) -> &EventBus {
        &self.deps.events
    }

    /// Writes a new entry.
    pub async fn create(&self, input: &EntryInput) -> Result<SaveOutcome> {
        let mut request = OpenRequest::new_entry();
        if let Some(course) = input.course_id {
            request = request.with_course(course);
        }
        let mut session = EditSession::open(self.deps.clone(), request)
            .await
            .context("Failed to start a new entry")?;
        input.apply(&mut session).await?;
        debug!("Creating entry {}", session.key());
        Ok(session.save().await)
    }

    /// Edits an entry, its offline draft taking precedence. Returns `None`
    /// when the input changes nothing.
    pub async fn edit(&self, key: EntryKey, input: &EntryInput) -> Result<Option<SaveOutcome>> {
        let mut request = OpenRequest::edit(key);
        if let Some(course) = input.course_id {
            request = request.with_course(course);
        }
        let mut session = EditSession::open(self.deps.clone(), request)
            .await
            .with_context(|| format!("Failed to open entry {key}"))?;
        input.apply(&mut session).await?;

        if !session.has_data_changed() {
            info!("Entry {} unchanged, nothing to save", key);
            return Ok(None);
        }
        Ok(Some(session.save().await))
    }

    /// Drafts waiting on this device, oldest first.
    pub async fn drafts(&self) -> Result<Vec<OfflineEntry>> {
        Ok(self.deps.offline.list().await?)
    }

    /// Sends every draft that is not being edited.
    pub async fn sync(&self) -> Result<SyncReport> {
        let synchronizer = DraftSynchronizer::new(
            self.deps.gateway.clone(),
            self.deps.offline.clone(),
            self.deps.locks.clone(),
            self.deps.files.clone(),
            self.deps.events.clone(),
            self.deps.config.component.clone(),
        );
        Ok(synchronizer.sync_all().await?)
    }
}
