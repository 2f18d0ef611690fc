use blogdesk_sync::gateway::mock::{GatewayCall, GatewayOp, MockGateway};
use blogdesk_sync::{
    DraftSynchronizer, EditEvent, EventBus, LocalFileStore, LockRegistry, OfflineStore,
    SqliteOfflineStore, SyncError, SyncReport,
};
use blogdesk_types::{
    AreaId, AttachmentsRef, BlogPost, EntryId, EntryKey, EntryOption, FileEntry, OfflineEntry,
    RemoteFile,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    gateway: Arc<MockGateway>,
    offline: Arc<SqliteOfflineStore>,
    locks: LockRegistry,
    events: EventBus,
    sync: DraftSynchronizer,
    dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let gateway = Arc::new(MockGateway::new());
    let offline = Arc::new(SqliteOfflineStore::open_in_memory(dir.path().join("files")).unwrap());
    let locks = LockRegistry::new();
    let events = EventBus::default();
    let sync = DraftSynchronizer::new(
        gateway.clone(),
        offline.clone(),
        locks.clone(),
        LocalFileStore::new(),
        events.clone(),
        "blog",
    );
    Fixture {
        gateway,
        offline,
        locks,
        events,
        sync,
        dir,
    }
}

fn draft(key: EntryKey, created: i64, subject: &str) -> OfflineEntry {
    OfflineEntry {
        key,
        created,
        subject: subject.to_string(),
        summary: "<p>offline</p>".to_string(),
        summary_format: 1,
        options: vec![
            EntryOption::new("publishstate", "draft"),
            EntryOption::new("courseassoc", 0),
            EntryOption::new("modassoc", 0),
        ],
        attachments: None,
        last_modified: created,
    }
}

fn remote(name: &str, size: u64) -> RemoteFile {
    RemoteFile {
        filename: name.to_string(),
        filepath: "/".to_string(),
        filesize: size,
        fileurl: String::new(),
        timemodified: 0,
        mimetype: None,
    }
}

impl Fixture {
    /// Stages `files` for `key` the way an offline save does.
    async fn stage(&self, key: EntryKey, files: &[(&str, &str)], online: Vec<FileEntry>) -> OfflineEntry {
        let picked_dir = self.dir.path().join("picked");
        std::fs::create_dir_all(&picked_dir).unwrap();
        let mut all = online;
        for (name, contents) in files {
            let path = picked_dir.join(name);
            std::fs::write(&path, contents.as_bytes()).unwrap();
            all.push(FileEntry::local(path, contents.len() as u64));
        }
        let stored = LocalFileStore::new()
            .store_files(&self.offline.folder_path(&key), &all)
            .await
            .unwrap();

        let created = match key {
            EntryKey::Pending(created) => created,
            EntryKey::Identified(_) => 900,
        };
        let mut entry = draft(key, created, "staged");
        entry.attachments = Some(stored);
        self.offline.save(&entry).await.unwrap();
        entry
    }
}

// ── Pushing drafts ──────────────────────────────────────────────

#[tokio::test]
async fn pending_draft_is_created_and_discarded() {
    let f = fixture();
    let mut rx = f.events.subscribe();
    let key = EntryKey::Pending(1234);
    f.offline.save(&draft(key, 1234, "Queued")).await.unwrap();

    let report = f.sync.sync_all().await.unwrap();

    assert_eq!(report.synced, vec![(key, EntryId::new(100))]);
    assert_eq!(
        f.gateway.calls(),
        vec![GatewayCall::Create {
            subject: "Queued".to_string(),
            created: 1234,
            attachments: None,
        }]
    );
    assert!(f.offline.list().await.unwrap().is_empty());
    assert_eq!(rx.try_recv().unwrap(), EditEvent::EntryUpdated);
    assert!(!f.locks.is_blocked("blog", key));
}

#[tokio::test]
async fn pending_draft_files_are_uploaded_first() {
    let f = fixture();
    let key = EntryKey::Pending(50);
    f.stage(key, &[("note.txt", "note")], Vec::new()).await;

    let report = f.sync.sync_all().await.unwrap();

    assert_eq!(report.synced.len(), 1);
    assert_eq!(f.gateway.ops(), vec![GatewayOp::UploadFiles, GatewayOp::Create]);
    match &f.gateway.calls()[1] {
        GatewayCall::Create { attachments, .. } => {
            assert_eq!(attachments, &Some(AttachmentsRef::Staged(AreaId::new(9000))));
        }
        other => panic!("unexpected call {other:?}"),
    }
    assert!(!f.offline.folder_path(&key).exists());
}

#[tokio::test]
async fn identified_draft_reconciles_attachments() {
    let f = fixture();
    let key = EntryKey::Identified(EntryId::new(42));
    let server: BlogPost = serde_json::from_value(json!({
        "id": 42,
        "subject": "Server",
        "attachmentfiles": [remote("old.pdf", 5), remote("kept.pdf", 6)],
    }))
    .unwrap();
    f.gateway.insert_post(server);
    f.stage(
        key,
        &[("added.txt", "added")],
        vec![FileEntry::Remote(remote("kept.pdf", 6))],
    )
    .await;

    let report = f.sync.sync_all().await.unwrap();

    assert_eq!(report.synced, vec![(key, EntryId::new(42))]);
    let area = AreaId::new(9000);
    assert_eq!(
        f.gateway.ops(),
        vec![
            GatewayOp::PrepareStagingArea,
            GatewayOp::FetchById,
            GatewayOp::DeleteFiles,
            GatewayOp::UploadFiles,
            GatewayOp::Update,
        ]
    );
    let names: Vec<String> = f
        .gateway
        .area_files(area)
        .iter()
        .map(|file| file.filename().to_string())
        .collect();
    assert_eq!(names, vec!["kept.pdf", "added.txt"]);
    assert_eq!(f.gateway.post(EntryId::new(42)).unwrap().subject, "staged");
}

// ── Failures ────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_draft_is_discarded_with_warning() {
    let f = fixture();
    let key = EntryKey::Pending(77);
    f.offline.save(&draft(key, 77, "Forbidden")).await.unwrap();
    f.gateway.fail_on(GatewayOp::Create, || {
        SyncError::rejected("nopermissions", "Blogs are disabled.")
    });

    let report = f.sync.sync_all().await.unwrap();

    assert_eq!(report.discarded, vec![key]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("Forbidden"));
    assert!(report.warnings[0].contains("Blogs are disabled."));
    assert!(f.offline.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn transport_failure_keeps_draft() {
    let f = fixture();
    let mut rx = f.events.subscribe();
    let key = EntryKey::Pending(88);
    f.offline.save(&draft(key, 88, "Later")).await.unwrap();
    f.gateway.fail_on(GatewayOp::Create, || SyncError::Network("offline".to_string()));

    let report = f.sync.sync_all().await.unwrap();

    assert_eq!(report.failed, vec![key]);
    assert!(!report.updated());
    assert!(f.offline.get(&key).await.unwrap().is_some());
    assert!(rx.try_recv().is_err());
    assert!(!f.locks.is_blocked("blog", key));
}

#[tokio::test]
async fn drafts_being_edited_are_skipped() {
    let f = fixture();
    let key = EntryKey::Pending(99);
    f.offline.save(&draft(key, 99, "Open")).await.unwrap();
    let _guard = f.locks.block("blog", key).unwrap();

    let report = f.sync.sync_all().await.unwrap();

    assert_eq!(report.skipped, vec![key]);
    assert!(f.gateway.calls().is_empty());
    assert!(f.offline.get(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn one_failure_does_not_stop_the_run() {
    let f = fixture();
    f.offline.save(&draft(EntryKey::Pending(1), 1, "first")).await.unwrap();
    f.offline
        .save(&draft(EntryKey::Identified(EntryId::new(500)), 2, "missing on server"))
        .await
        .unwrap();
    f.offline.save(&draft(EntryKey::Pending(3), 3, "third")).await.unwrap();

    let report = f.sync.sync_all().await.unwrap();

    assert_eq!(report.synced.len(), 2);
    assert_eq!(report.discarded, vec![EntryKey::Identified(EntryId::new(500))]);
    assert!(f.offline.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_store_emits_nothing() {
    let f = fixture();
    let mut rx = f.events.subscribe();

    let report = f.sync.sync_all().await.unwrap();

    assert_eq!(report, SyncReport::default());
    assert!(rx.try_recv().is_err());
}
