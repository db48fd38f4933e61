use httpmock::prelude::*;
use httpmock::Method::PATCH;
use pref_sync::core::OrderedPreferenceList;
use pref_sync::domain::model::{ProjectId, StudentId};
use pref_sync::{
    HttpProjectCatalog, PortalError, PreferenceStore, ReorderController, ReorderOutcome, SyncPhase,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// 模擬伺服器：固定回傳 A(1), B(2), ... 的清單
async fn mock_catalog(server: &MockServer, ids: &[&str]) {
    let ranked: Vec<Value> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| json!({"projectId": id, "rank": i + 1}))
        .collect();
    let summaries: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "title": format!("Project {}", id)}))
        .collect();

    server
        .mock_async(|when, then| {
            when.method(GET).path("/students/s-1/preferences");
            then.status(200).json_body(Value::Array(ranked));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/projects/lookup");
            then.status(200).json_body(Value::Array(summaries));
        })
        .await;
}

fn controller_for(server: &MockServer, timeout: Duration) -> ReorderController {
    let catalog = Arc::new(HttpProjectCatalog::new(server.base_url()));
    let store = Arc::new(PreferenceStore::new(catalog));
    ReorderController::new(StudentId::from("s-1"), store, timeout)
}

fn ranked(list: &OrderedPreferenceList) -> Vec<(String, u32)> {
    list.entries()
        .iter()
        .map(|e| (e.project_id().0.clone(), e.rank()))
        .collect()
}

fn pid(id: &str) -> ProjectId {
    ProjectId::from(id)
}

#[tokio::test]
async fn test_move_down_sends_exactly_two_rank_updates() {
    let server = MockServer::start_async().await;
    mock_catalog(&server, &["A", "B", "C"]).await;
    let a_to_2 = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/students/s-1/preferences/A")
                .json_body(json!({"rank": 2}));
            then.status(200);
        })
        .await;
    let b_to_1 = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/students/s-1/preferences/B")
                .json_body(json!({"rank": 1}));
            then.status(200);
        })
        .await;
    let c_untouched = server
        .mock_async(|when, then| {
            when.method(PATCH).path("/students/s-1/preferences/C");
            then.status(200);
        })
        .await;

    let controller = controller_for(&server, Duration::from_secs(2));
    controller.load().await.unwrap();
    let outcome = controller.move_down(&pid("A")).await.unwrap();

    assert!(outcome.is_committed());
    a_to_2.assert_async().await;
    b_to_1.assert_async().await;
    assert_eq!(c_untouched.hits_async().await, 0);
    assert_eq!(
        ranked(&controller.snapshot()),
        vec![
            ("B".to_string(), 1),
            ("A".to_string(), 2),
            ("C".to_string(), 3)
        ]
    );
}

#[tokio::test]
async fn test_drag_last_to_first_updates_all_four() {
    let server = MockServer::start_async().await;
    mock_catalog(&server, &["A", "B", "C", "D"]).await;
    let mut patches = Vec::new();
    for (id, rank) in [("D", 1), ("A", 2), ("B", 3), ("C", 4)] {
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path(format!("/students/s-1/preferences/{}", id))
                    .json_body(json!({ "rank": rank }));
                then.status(200);
            })
            .await;
        patches.push(mock);
    }

    let controller = controller_for(&server, Duration::from_secs(2));
    controller.load().await.unwrap();
    let outcome = controller.move_to_index(&pid("D"), 0).await.unwrap();

    assert!(outcome.is_committed());
    for mock in &patches {
        mock.assert_async().await;
    }
    assert_eq!(
        ranked(&controller.snapshot()),
        vec![
            ("D".to_string(), 1),
            ("A".to_string(), 2),
            ("B".to_string(), 3),
            ("C".to_string(), 4)
        ]
    );
}

#[tokio::test]
async fn test_one_failed_write_snaps_back_to_server_order() {
    let server = MockServer::start_async().await;
    mock_catalog(&server, &["A", "B", "C"]).await;
    server
        .mock_async(|when, then| {
            when.method(PATCH).path("/students/s-1/preferences/A");
            then.status(500);
        })
        .await;
    let b_to_1 = server
        .mock_async(|when, then| {
            when.method(PATCH).path("/students/s-1/preferences/B");
            then.status(200);
        })
        .await;

    let controller = controller_for(&server, Duration::from_secs(2));
    let mut events = controller.subscribe();
    controller.load().await.unwrap();
    let outcome = controller.move_down(&pid("A")).await.unwrap();

    b_to_1.assert_async().await;
    match outcome {
        ReorderOutcome::RolledBack {
            list,
            error,
            reload_error,
        } => {
            assert!(matches!(
                error,
                PortalError::PartialSyncFailure {
                    failed: 1,
                    total: 2,
                    ..
                }
            ));
            assert!(reload_error.is_none());
            assert_eq!(
                ranked(&list),
                vec![
                    ("A".to_string(), 1),
                    ("B".to_string(), 2),
                    ("C".to_string(), 3)
                ]
            );
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        ranked(&controller.snapshot()),
        vec![
            ("A".to_string(), 1),
            ("B".to_string(), 2),
            ("C".to_string(), 3)
        ]
    );
    assert!(events.recv().await.unwrap().is_rollback());
    assert_eq!(controller.phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn test_slow_write_counts_as_failure() {
    let server = MockServer::start_async().await;
    mock_catalog(&server, &["A", "B"]).await;
    server
        .mock_async(|when, then| {
            when.method(PATCH).path("/students/s-1/preferences/A");
            then.status(200).delay(Duration::from_millis(800));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PATCH).path("/students/s-1/preferences/B");
            then.status(200);
        })
        .await;

    let controller = controller_for(&server, Duration::from_millis(100));
    controller.load().await.unwrap();
    let outcome = controller.move_down(&pid("A")).await.unwrap();

    match outcome {
        ReorderOutcome::RolledBack { error, .. } => {
            assert!(error.to_string().contains("timed out"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        ranked(&controller.snapshot()),
        vec![("A".to_string(), 1), ("B".to_string(), 2)]
    );
}

#[tokio::test]
async fn test_failed_initial_load_leaves_store_empty() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/students/s-1/preferences");
            then.status(503);
        })
        .await;

    let controller = controller_for(&server, Duration::from_secs(1));
    let err = controller.load().await.unwrap_err();

    assert!(matches!(err, PortalError::Fetch { .. }));
    assert!(controller.snapshot().is_empty());
}

#[tokio::test]
async fn test_withdraw_deletes_and_renumbers() {
    let server = MockServer::start_async().await;
    mock_catalog(&server, &["A", "B", "C"]).await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/students/s-1/preferences/A");
            then.status(204);
        })
        .await;
    let b_to_1 = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/students/s-1/preferences/B")
                .json_body(json!({"rank": 1}));
            then.status(200);
        })
        .await;
    let c_to_2 = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/students/s-1/preferences/C")
                .json_body(json!({"rank": 2}));
            then.status(200);
        })
        .await;

    let controller = controller_for(&server, Duration::from_secs(2));
    controller.load().await.unwrap();
    let outcome = controller.withdraw(&pid("A")).await.unwrap();

    assert!(outcome.is_committed());
    delete.assert_async().await;
    b_to_1.assert_async().await;
    c_to_2.assert_async().await;
    assert_eq!(
        ranked(&controller.snapshot()),
        vec![("B".to_string(), 1), ("C".to_string(), 2)]
    );
}
