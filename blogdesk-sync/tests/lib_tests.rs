use blogdesk_sync::{
    Connectivity, EditEvent, EntryDraft, EventBus, LockRegistry, MoodleConfig, NetworkStatus,
    SessionConfig, SyncError,
};
use blogdesk_types::{
    AreaId, AttachmentsRef, EntryId, EntryKey, EntryOption, PublishState,
};
use pretty_assertions::assert_eq;

// ── LockRegistry ────────────────────────────────────────────────

#[test]
fn lock_blocks_until_released() {
    let locks = LockRegistry::new();
    let key = EntryKey::Identified(EntryId::new(42));

    let guard = locks.block("blog", key).unwrap();
    assert!(locks.is_blocked("blog", key));
    assert!(matches!(locks.block("blog", key), Err(SyncError::Locked(_))));

    guard.release();
    assert!(!locks.is_blocked("blog", key));
    assert!(locks.block("blog", key).is_ok());
}

#[test]
fn lock_released_on_drop() {
    let locks = LockRegistry::new();
    {
        let _guard = locks.block("blog", EntryKey::Pending(5)).unwrap();
        assert!(locks.is_blocked("blog", "new-5"));
    }
    assert!(!locks.is_blocked("blog", "new-5"));
}

#[test]
fn locks_are_per_component_and_key() {
    let locks = LockRegistry::new();
    let _a = locks.block("blog", 1).unwrap();
    let _b = locks.block("blog", 2).unwrap();
    let _c = locks.block("forum", 1).unwrap();

    assert!(locks.is_blocked("blog", 1));
    assert!(!locks.is_blocked("blog", 3));
}

#[test]
fn cloned_registries_share_state() {
    let locks = LockRegistry::new();
    let other = locks.clone();
    let _guard = locks.block("blog", 7).unwrap();
    assert!(other.is_blocked("blog", 7));
}

#[tokio::test]
async fn lock_guard_released_across_tasks() {
    let locks = LockRegistry::new();
    let guard = locks.block("blog", 9).unwrap();

    tokio::spawn(async move { guard.release() }).await.unwrap();

    assert!(!locks.is_blocked("blog", 9));
}

// ── EventBus ────────────────────────────────────────────────────

#[tokio::test]
async fn events_reach_every_subscriber() {
    let bus = EventBus::new(8);
    let mut a = bus.subscribe();
    let mut b = bus.subscribe();

    bus.emit(EditEvent::FormSubmitted {
        site_id: "site".to_string(),
    });

    let expected = EditEvent::FormSubmitted {
        site_id: "site".to_string(),
    };
    assert_eq!(a.recv().await.unwrap(), expected);
    assert_eq!(b.recv().await.unwrap(), expected);
}

#[test]
fn emit_without_subscribers_is_harmless() {
    EventBus::default().emit(EditEvent::EntryUpdated);
}

// ── Connectivity ────────────────────────────────────────────────

#[test]
fn network_status_flips() {
    let status = NetworkStatus::default();
    assert!(status.is_online());
    status.set_online(false);
    assert!(!status.is_online());
}

// ── SyncError ───────────────────────────────────────────────────

#[test]
fn error_kinds_are_classified() {
    let rejected = SyncError::rejected("nopermissions", "No access");
    assert!(rejected.is_service_rejection());
    assert!(!rejected.is_transport_failure());
    assert_eq!(rejected.user_message(), Some("No access"));

    for transport in [
        SyncError::Network("down".to_string()),
        SyncError::Timeout,
        SyncError::Storage("disk full".to_string()),
    ] {
        assert!(transport.is_transport_failure());
        assert!(!transport.is_service_rejection());
        assert_eq!(transport.user_message(), None);
    }

    let stale = SyncError::Stale {
        entry_id: EntryId::new(1),
        last_modified: 1,
        expected: 2,
    };
    assert!(!stale.is_transport_failure());
    assert!(!stale.is_service_rejection());
}

#[test]
fn error_display() {
    let err = SyncError::Rejected {
        errorcode: "invalidparameter".to_string(),
        message: None,
    };
    assert_eq!(err.to_string(), "web service rejected the request: invalidparameter");
    assert_eq!(
        SyncError::rejected("x", "Subject is required").to_string(),
        "web service rejected the request: Subject is required"
    );
    assert_eq!(SyncError::Timeout.to_string(), "operation timed out");
    assert_eq!(
        SyncError::Locked("blog:42".to_string()).to_string(),
        "operation locked: blog:42"
    );
}

#[test]
fn io_and_sqlite_errors_are_storage_failures() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    assert!(matches!(SyncError::from(io), SyncError::Storage(_)));

    let sqlite = rusqlite::Connection::open_in_memory()
        .unwrap()
        .execute("INSERT INTO nowhere VALUES (1)", [])
        .unwrap_err();
    assert!(SyncError::from(sqlite).is_transport_failure());
}

#[test]
fn json_errors_convert() {
    let err = serde_json::from_str::<i64>("nope").unwrap_err();
    assert!(matches!(SyncError::from(err), SyncError::Serialization(_)));
}

// ── EntryDraft ──────────────────────────────────────────────────

#[test]
fn draft_options_encode_associations() {
    let mut draft = EntryDraft::new("s", "b");
    draft.publish_state = PublishState::Public;
    draft.course_id = Some(7);

    assert_eq!(
        draft.options(),
        vec![
            EntryOption::new("publishstate", "public"),
            EntryOption::new("courseassoc", 7),
            EntryOption::new("modassoc", 0),
        ]
    );

    let staged = draft.with_attachments(Some(AttachmentsRef::Staged(AreaId::new(3))));
    assert_eq!(staged.attachments, Some(AttachmentsRef::Staged(AreaId::new(3))));
}

// ── Config defaults ─────────────────────────────────────────────

#[test]
fn session_config_defaults() {
    let cfg = SessionConfig::default();
    assert_eq!(cfg.site_id, "default");
    assert_eq!(cfg.component, "blog");
    assert_eq!(cfg.site_home_id, Some(1));
    assert_eq!(cfg.max_files, 99);
}

#[test]
fn session_config_fills_missing_fields() {
    let cfg: SessionConfig = serde_json::from_str(r#"{"max_files": 5}"#).unwrap();
    assert_eq!(cfg.max_files, 5);
    assert_eq!(cfg.component, "blog");
}

#[test]
fn moodle_config_defaults() {
    let cfg = MoodleConfig::default();
    assert_eq!(cfg.timeout_secs, 30);
    assert!(cfg.token.is_empty());
}
