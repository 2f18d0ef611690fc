//! Remote data gateway abstraction.
//!
//! Defines the web-service operations the save workflow depends on, so the
//! orchestrator can run against the Moodle gateway or an in-memory double.

use crate::error::SyncResult;
use async_trait::async_trait;
use blogdesk_types::{
    AreaId, AttachmentsRef, BlogPost, EntryFilter, EntryId, EntryOption, FileEntry, PublishState,
    SUMMARY_FORMAT_HTML,
};

/// The editable content of an entry, as sent on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub subject: String,
    pub summary: String,
    pub summary_format: i32,
    pub publish_state: PublishState,
    /// Course association, if enabled in the form.
    pub course_id: Option<i64>,
    /// Course module association, if enabled in the form.
    pub module_id: Option<i64>,
    pub attachments: Option<AttachmentsRef>,
}

impl EntryDraft {
    pub fn new(subject: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            summary: summary.into(),
            summary_format: SUMMARY_FORMAT_HTML,
            publish_state: PublishState::default(),
            course_id: None,
            module_id: None,
            attachments: None,
        }
    }

    pub fn with_attachments(mut self, attachments: Option<AttachmentsRef>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Options shared by the online and offline paths. The attachment area is
    /// appended by whoever knows the final area id.
    pub fn options(&self) -> Vec<EntryOption> {
        vec![
            EntryOption::new("publishstate", self.publish_state),
            EntryOption::new("courseassoc", self.course_id.unwrap_or(0)),
            EntryOption::new("modassoc", self.module_id.unwrap_or(0)),
        ]
    }
}

/// Web-service operations used by the entry save workflow.
///
/// Every method fails with either a service rejection or a transport failure
/// (see [`crate::SyncError::is_service_rejection`]).
#[async_trait]
pub trait BlogGateway: Send + Sync {
    /// Creates a new entry and returns its server id.
    async fn create(&self, draft: &EntryDraft, created: i64) -> SyncResult<EntryId>;

    /// Updates an existing entry.
    async fn update(&self, id: EntryId, draft: &EntryDraft) -> SyncResult<()>;

    /// Fetches entries matching a filter set.
    async fn fetch_by_filter(&self, filter: &EntryFilter) -> SyncResult<Vec<BlogPost>>;

    /// Fetches a single entry, bypassing list caches.
    async fn fetch_by_id(&self, id: EntryId) -> SyncResult<Vec<BlogPost>>;

    /// Copies an entry's current attachments into a fresh draft area.
    async fn prepare_staging_area(&self, id: EntryId) -> SyncResult<AreaId>;

    /// Uploads files into an area; `None` opens a new one. Files already on
    /// the server are not transferred again.
    async fn upload_files(&self, area: Option<AreaId>, files: &[FileEntry]) -> SyncResult<AreaId>;

    /// Removes files from a draft area.
    async fn delete_files(&self, area: AreaId, files: &[FileEntry]) -> SyncResult<()>;
}

/// An in-memory gateway for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use blogdesk_types::{FileKey, RemoteFile};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Gateway operation names, used to script failures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum GatewayOp {
        Create,
        Update,
        FetchByFilter,
        FetchById,
        PrepareStagingArea,
        UploadFiles,
        DeleteFiles,
    }

    /// A recorded gateway call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum GatewayCall {
        Create {
            subject: String,
            created: i64,
            attachments: Option<AttachmentsRef>,
        },
        Update {
            id: EntryId,
            subject: String,
            attachments: Option<AttachmentsRef>,
        },
        FetchByFilter(EntryFilter),
        FetchById(EntryId),
        PrepareStagingArea(EntryId),
        UploadFiles {
            area: Option<AreaId>,
            files: Vec<FileKey>,
        },
        DeleteFiles {
            area: AreaId,
            files: Vec<FileKey>,
        },
    }

    impl GatewayCall {
        pub fn op(&self) -> GatewayOp {
            match self {
                Self::Create { .. } => GatewayOp::Create,
                Self::Update { .. } => GatewayOp::Update,
                Self::FetchByFilter(_) => GatewayOp::FetchByFilter,
                Self::FetchById(_) => GatewayOp::FetchById,
                Self::PrepareStagingArea(_) => GatewayOp::PrepareStagingArea,
                Self::UploadFiles { .. } => GatewayOp::UploadFiles,
                Self::DeleteFiles { .. } => GatewayOp::DeleteFiles,
            }
        }
    }

    type FailureFn = Box<dyn Fn() -> SyncError + Send + Sync>;

    #[derive(Default)]
    struct MockState {
        calls: Vec<GatewayCall>,
        posts: HashMap<EntryId, BlogPost>,
        /// Posts returned by filtered fetches when set, to mimic list caches.
        listed: Option<Vec<BlogPost>>,
        areas: HashMap<AreaId, Vec<FileEntry>>,
        next_entry_id: i64,
        next_area_id: i64,
    }

    /// A recording gateway backed by in-memory posts and draft areas.
    pub struct MockGateway {
        state: Mutex<MockState>,
        failures: Mutex<HashMap<GatewayOp, FailureFn>>,
    }

    impl Default for MockGateway {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockGateway {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(MockState {
                    next_entry_id: 100,
                    next_area_id: 9000,
                    ..Default::default()
                }),
                failures: Mutex::new(HashMap::new()),
            }
        }

        /// Seeds a post as if it already existed on the server.
        pub fn insert_post(&self, post: BlogPost) {
            self.state.lock().unwrap().posts.insert(post.id, post);
        }

        /// Overrides what filtered fetches return.
        pub fn set_listed_posts(&self, posts: Vec<BlogPost>) {
            self.state.lock().unwrap().listed = Some(posts);
        }

        pub fn post(&self, id: EntryId) -> Option<BlogPost> {
            self.state.lock().unwrap().posts.get(&id).cloned()
        }

        /// Makes every call to `op` fail with the error built by `make`.
        pub fn fail_on(&self, op: GatewayOp, make: impl Fn() -> SyncError + Send + Sync + 'static) {
            self.failures.lock().unwrap().insert(op, Box::new(make));
        }

        pub fn clear_failures(&self) {
            self.failures.lock().unwrap().clear();
        }

        pub fn calls(&self) -> Vec<GatewayCall> {
            self.state.lock().unwrap().calls.clone()
        }

        pub fn ops(&self) -> Vec<GatewayOp> {
            self.calls().iter().map(GatewayCall::op).collect()
        }

        pub fn area_files(&self, area: AreaId) -> Vec<FileEntry> {
            self.state
                .lock()
                .unwrap()
                .areas
                .get(&area)
                .cloned()
                .unwrap_or_default()
        }

        fn record(&self, call: GatewayCall) -> SyncResult<()> {
            let op = call.op();
            self.state.lock().unwrap().calls.push(call);
            match self.failures.lock().unwrap().get(&op) {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }

        fn to_remote(file: &FileEntry, area: AreaId) -> RemoteFile {
            match file {
                FileEntry::Remote(remote) => remote.clone(),
                FileEntry::Local { filename, filesize, .. } => RemoteFile {
                    filename: filename.clone(),
                    filepath: "/".to_string(),
                    filesize: *filesize,
                    fileurl: format!("https://mock.invalid/draftfile.php/{area}/{filename}"),
                    timemodified: 0,
                    mimetype: None,
                },
            }
        }

        fn apply_attachments(state: &mut MockState, post_id: EntryId, attachments: &Option<AttachmentsRef>) {
            let Some(AttachmentsRef::Staged(area)) = attachments else {
                return;
            };
            let files: Vec<RemoteFile> = state
                .areas
                .get(area)
                .map(|files| files.iter().map(|f| Self::to_remote(f, *area)).collect())
                .unwrap_or_default();
            if let Some(post) = state.posts.get_mut(&post_id) {
                post.attachmentfiles = files;
            }
        }
    }

    #[async_trait]
    impl BlogGateway for MockGateway {
        async fn create(&self, draft: &EntryDraft, created: i64) -> SyncResult<EntryId> {
            self.record(GatewayCall::Create {
                subject: draft.subject.clone(),
                created,
                attachments: draft.attachments.clone(),
            })?;

            let mut state = self.state.lock().unwrap();
            let id = EntryId::new(state.next_entry_id);
            state.next_entry_id += 1;
            let post = BlogPost {
                id,
                module: "blog".to_string(),
                userid: 0,
                courseid: draft.course_id.unwrap_or(0),
                groupid: 0,
                moduleid: 0,
                coursemoduleid: draft.module_id.unwrap_or(0),
                subject: draft.subject.clone(),
                summary: draft.summary.clone(),
                summaryformat: draft.summary_format,
                content: None,
                uniquehash: String::new(),
                rating: 0,
                format: draft.summary_format,
                attachment: None,
                publishstate: draft.publish_state,
                lastmodified: created,
                created,
                usermodified: None,
                summaryfiles: Vec::new(),
                attachmentfiles: Vec::new(),
            };
            state.posts.insert(id, post);
            Self::apply_attachments(&mut state, id, &draft.attachments);
            Ok(id)
        }

        async fn update(&self, id: EntryId, draft: &EntryDraft) -> SyncResult<()> {
            self.record(GatewayCall::Update {
                id,
                subject: draft.subject.clone(),
                attachments: draft.attachments.clone(),
            })?;

            let mut state = self.state.lock().unwrap();
            let post = state
                .posts
                .get_mut(&id)
                .ok_or_else(|| SyncError::rejected("invalidentryid", "Entry not found"))?;
            post.subject = draft.subject.clone();
            post.summary = draft.summary.clone();
            post.publishstate = draft.publish_state;
            post.courseid = draft.course_id.unwrap_or(0);
            post.coursemoduleid = draft.module_id.unwrap_or(0);
            post.lastmodified += 1;
            Self::apply_attachments(&mut state, id, &draft.attachments);
            Ok(())
        }

        async fn fetch_by_filter(&self, filter: &EntryFilter) -> SyncResult<Vec<BlogPost>> {
            self.record(GatewayCall::FetchByFilter(filter.clone()))?;

            let state = self.state.lock().unwrap();
            if let Some(listed) = &state.listed {
                return Ok(listed.clone());
            }
            let mut posts: Vec<BlogPost> = state
                .posts
                .values()
                .filter(|p| filter.entryid.is_none_or(|id| id == p.id))
                .filter(|p| filter.courseid.is_none_or(|c| c == p.courseid))
                .cloned()
                .collect();
            posts.sort_by_key(|p| p.id);
            Ok(posts)
        }

        async fn fetch_by_id(&self, id: EntryId) -> SyncResult<Vec<BlogPost>> {
            self.record(GatewayCall::FetchById(id))?;
            let state = self.state.lock().unwrap();
            Ok(state.posts.get(&id).cloned().into_iter().collect())
        }

        async fn prepare_staging_area(&self, id: EntryId) -> SyncResult<AreaId> {
            self.record(GatewayCall::PrepareStagingArea(id))?;

            let mut state = self.state.lock().unwrap();
            let files = state
                .posts
                .get(&id)
                .map(BlogPost::files)
                .ok_or_else(|| SyncError::rejected("invalidentryid", "Entry not found"))?;
            let area = AreaId::new(state.next_area_id);
            state.next_area_id += 1;
            state.areas.insert(area, files);
            Ok(area)
        }

        async fn upload_files(&self, area: Option<AreaId>, files: &[FileEntry]) -> SyncResult<AreaId> {
            self.record(GatewayCall::UploadFiles {
                area,
                files: files.iter().map(FileEntry::key).collect(),
            })?;

            let mut state = self.state.lock().unwrap();
            let area = match area {
                Some(area) => area,
                None => {
                    let area = AreaId::new(state.next_area_id);
                    state.next_area_id += 1;
                    area
                }
            };
            let stored = state.areas.entry(area).or_default();
            for file in files {
                if !stored.iter().any(|f| f.key() == file.key()) {
                    stored.push(file.clone());
                }
            }
            Ok(area)
        }

        async fn delete_files(&self, area: AreaId, files: &[FileEntry]) -> SyncResult<()> {
            self.record(GatewayCall::DeleteFiles {
                area,
                files: files.iter().map(FileEntry::key).collect(),
            })?;

            let mut state = self.state.lock().unwrap();
            if let Some(stored) = state.areas.get_mut(&area) {
                stored.retain(|f| !files.iter().any(|d| d.key() == f.key()));
            }
            Ok(())
        }
    }
}
