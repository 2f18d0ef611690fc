use blogdesk_sync::gateway::mock::{GatewayCall, GatewayOp, MockGateway};
use blogdesk_sync::{fetch_entry, FetchRequest, SyncError};
use blogdesk_types::{BlogPost, EntryFilter, EntryId};
use pretty_assertions::assert_eq;
use serde_json::json;

fn post(id: i64, subject: &str, lastmodified: i64) -> BlogPost {
    serde_json::from_value(json!({
        "id": id,
        "subject": subject,
        "courseid": 7,
        "lastmodified": lastmodified,
    }))
    .unwrap()
}

fn course_filter() -> EntryFilter {
    EntryFilter {
        courseid: Some(7),
        ..Default::default()
    }
}

fn listed_request(last_modified: Option<i64>) -> FetchRequest {
    FetchRequest {
        entry_id: EntryId::new(42),
        filters: Some(course_filter()),
        last_modified,
    }
}

// ── Direct fetch ────────────────────────────────────────────────

#[tokio::test]
async fn direct_fetch_returns_entry() {
    let gateway = MockGateway::new();
    gateway.insert_post(post(42, "Hello", 100));

    let found = fetch_entry(&gateway, &FetchRequest::new(EntryId::new(42))).await.unwrap();

    assert_eq!(found.subject, "Hello");
    assert_eq!(gateway.calls(), vec![GatewayCall::FetchById(EntryId::new(42))]);
}

#[tokio::test]
async fn missing_entry_without_filters_is_not_found() {
    let gateway = MockGateway::new();
    let err = fetch_entry(&gateway, &FetchRequest::new(EntryId::new(42)))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
    assert_eq!(gateway.ops(), vec![GatewayOp::FetchById]);
}

#[tokio::test]
async fn transport_failure_without_filters_is_returned() {
    let gateway = MockGateway::new();
    gateway.fail_on(GatewayOp::FetchById, || SyncError::Timeout);

    let err = fetch_entry(&gateway, &FetchRequest::new(EntryId::new(42)))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Timeout));
}

// ── Filtered refetch ────────────────────────────────────────────

#[tokio::test]
async fn up_to_date_entry_skips_refetch() {
    let gateway = MockGateway::new();
    gateway.insert_post(post(42, "Hello", 500));

    let found = fetch_entry(&gateway, &listed_request(Some(500))).await.unwrap();

    assert_eq!(found.lastmodified, 500);
    assert_eq!(gateway.ops(), vec![GatewayOp::FetchById]);
}

#[tokio::test]
async fn stale_entry_is_refetched_with_filters() {
    let gateway = MockGateway::new();
    gateway.insert_post(post(42, "Old", 400));
    gateway.set_listed_posts(vec![post(41, "Other", 10), post(42, "New", 500)]);

    let found = fetch_entry(&gateway, &listed_request(Some(500))).await.unwrap();

    assert_eq!(found.subject, "New");
    assert_eq!(
        gateway.calls(),
        vec![
            GatewayCall::FetchById(EntryId::new(42)),
            GatewayCall::FetchByFilter(course_filter()),
        ]
    );
}

#[tokio::test]
async fn stale_entry_missing_from_list_falls_back_to_outdated_copy() {
    let gateway = MockGateway::new();
    gateway.insert_post(post(42, "Old", 400));
    gateway.set_listed_posts(vec![post(41, "Other", 10)]);

    let found = fetch_entry(&gateway, &listed_request(Some(500))).await.unwrap();

    assert_eq!(found.subject, "Old");
    assert_eq!(found.lastmodified, 400);
}

#[tokio::test]
async fn transport_failure_is_retried_with_filters() {
    let gateway = MockGateway::new();
    gateway.fail_on(GatewayOp::FetchById, || {
        SyncError::Network("reset by peer".to_string())
    });
    gateway.set_listed_posts(vec![post(42, "Listed", 300)]);

    let found = fetch_entry(&gateway, &listed_request(None)).await.unwrap();

    assert_eq!(found.subject, "Listed");
}

#[tokio::test]
async fn transport_failure_missing_from_list_is_returned() {
    let gateway = MockGateway::new();
    gateway.fail_on(GatewayOp::FetchById, || SyncError::Timeout);
    gateway.set_listed_posts(vec![]);

    let err = fetch_entry(&gateway, &listed_request(None)).await.unwrap_err();

    assert!(matches!(err, SyncError::Timeout));
}

#[tokio::test]
async fn rejection_is_never_retried() {
    let gateway = MockGateway::new();
    gateway.fail_on(GatewayOp::FetchById, || {
        SyncError::rejected("nopermissiontoviewentry", "You cannot see this entry.")
    });

    let err = fetch_entry(&gateway, &listed_request(Some(1))).await.unwrap_err();

    assert!(err.is_service_rejection());
    assert_eq!(gateway.ops(), vec![GatewayOp::FetchById]);
}

#[tokio::test]
async fn failing_filtered_fetch_reports_its_own_error() {
    let gateway = MockGateway::new();
    gateway.insert_post(post(42, "Old", 400));
    gateway.fail_on(GatewayOp::FetchByFilter, || {
        SyncError::rejected("invalidfilter", "Bad filter")
    });

    let err = fetch_entry(&gateway, &listed_request(Some(500))).await.unwrap_err();

    assert_eq!(err.user_message(), Some("Bad filter"));
}

#[tokio::test]
async fn missing_everywhere_is_not_found() {
    let gateway = MockGateway::new();
    gateway.set_listed_posts(vec![post(41, "Other", 10)]);

    let err = fetch_entry(&gateway, &listed_request(Some(500))).await.unwrap_err();

    assert!(matches!(err, SyncError::NotFound(_)));
    assert_eq!(gateway.ops(), vec![GatewayOp::FetchById, GatewayOp::FetchByFilter]);
}

#[tokio::test]
async fn empty_filters_count_as_no_list_context() {
    let gateway = MockGateway::new();
    gateway.insert_post(post(42, "Direct", 100));
    let request = FetchRequest {
        entry_id: EntryId::new(42),
        filters: Some(EntryFilter::default()),
        last_modified: Some(500),
    };

    let found = fetch_entry(&gateway, &request).await.unwrap();

    assert_eq!(found.subject, "Direct");
    assert_eq!(gateway.ops(), vec![GatewayOp::FetchById]);
}
