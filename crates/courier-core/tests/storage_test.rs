//! Queue integration tests against a real PostgreSQL instance.
//!
//! These tests exercise the claim protocol and terminal-status discipline
//! end to end. They require `TEST_DATABASE_URL` to point at a disposable
//! database; when it is unset each test skips with a note so the suite
//! stays green without local infrastructure.

use std::{collections::HashSet, sync::OnceLock, time::Duration};

use courier_core::{storage, CoreError, MessageStatus, NewMessage, Storage};
use sqlx::PgPool;

/// Serializes tests touching the shared `messages` table.
static DB_LOCK: OnceLock<tokio::sync::Mutex<()>> = OnceLock::new();

fn db_lock() -> &'static tokio::sync::Mutex<()> {
    DB_LOCK.get_or_init(|| tokio::sync::Mutex::new(()))
}

async fn test_storage() -> Option<Storage> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPool::connect(&url).await.expect("failed to connect to test database");
    storage::migrate(&pool).await.expect("failed to run migrations");
    sqlx::query("TRUNCATE messages").execute(&pool).await.expect("failed to reset table");

    Some(Storage::new(pool))
}

fn new_message(content: &str) -> NewMessage {
    NewMessage { to: "+905551111111".to_string(), content: content.to_string() }
}

#[tokio::test]
async fn claims_follow_insertion_order() {
    let _guard = db_lock().lock().await;
    let Some(storage) = test_storage().await else { return };

    let mut inserted = Vec::new();
    for i in 0..3 {
        inserted.push(storage.messages.create(&new_message(&format!("message {i}"))).await.unwrap());
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    for expected in &inserted {
        let claimed = storage.messages.claim_next().await.unwrap().expect("row available");
        assert_eq!(claimed.id, expected.id);
        assert_eq!(claimed.status, MessageStatus::Sending);
        assert!(claimed.updated_at >= expected.updated_at);
    }

    assert!(storage.messages.claim_next().await.unwrap().is_none());
}

#[tokio::test]
async fn claim_on_empty_queue_returns_none() {
    let _guard = db_lock().lock().await;
    let Some(storage) = test_storage().await else { return };

    assert!(storage.messages.claim_next().await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_claimers_never_share_a_row() {
    let _guard = db_lock().lock().await;
    let Some(storage) = test_storage().await else { return };

    for i in 0..10 {
        storage.messages.create(&new_message(&format!("message {i}"))).await.unwrap();
    }

    let mut claimers = Vec::new();
    for _ in 0..2 {
        let storage = storage.clone();
        claimers.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for _ in 0..5 {
                if let Some(message) = storage.messages.claim_next().await.unwrap() {
                    ids.push(message.id);
                }
            }
            ids
        }));
    }

    let mut all_ids = Vec::new();
    for claimer in claimers {
        all_ids.extend(claimer.await.unwrap());
    }

    let distinct: HashSet<i64> = all_ids.iter().copied().collect();
    assert_eq!(all_ids.len(), 10, "every pending row is claimed exactly once");
    assert_eq!(distinct.len(), 10, "no row is handed to two claimers");
}

#[tokio::test]
async fn finalize_writes_only_provided_fields() {
    let _guard = db_lock().lock().await;
    let Some(storage) = test_storage().await else { return };

    let message = storage.messages.create(&new_message("hello")).await.unwrap();
    storage.messages.claim_next().await.unwrap();

    storage
        .messages
        .finalize(message.id, MessageStatus::Failed, None, None, None)
        .await
        .unwrap();

    let failed = storage.messages.find_by_id(message.id).await.unwrap().unwrap();
    assert_eq!(failed.status, MessageStatus::Failed);
    assert!(failed.sent_at.is_none());
    assert!(failed.message_id.is_none());
    assert!(failed.webhook_response.is_none());
    assert!(failed.updated_at > message.updated_at);
}

#[tokio::test]
async fn sent_rows_carry_all_delivery_fields() {
    let _guard = db_lock().lock().await;
    let Some(storage) = test_storage().await else { return };

    let message = storage.messages.create(&new_message("hello")).await.unwrap();
    storage.messages.claim_next().await.unwrap();

    let response = serde_json::json!({"status_code": 200, "message": "ok"});
    let now = chrono::Utc::now();
    storage
        .messages
        .finalize(
            message.id,
            MessageStatus::Sent,
            Some(now),
            Some("provider-42".to_string()),
            Some(response.clone()),
        )
        .await
        .unwrap();

    let sent = storage.messages.find_by_id(message.id).await.unwrap().unwrap();
    assert_eq!(sent.status, MessageStatus::Sent);
    assert!(sent.sent_at.expect("sent_at set") >= message.created_at);
    assert_eq!(sent.message_id.as_deref(), Some("provider-42"));
    assert_eq!(sent.webhook_response, Some(response));
}

#[tokio::test]
async fn sent_history_is_ordered_by_recency() {
    let _guard = db_lock().lock().await;
    let Some(storage) = test_storage().await else { return };

    let base = chrono::Utc::now();
    let mut ids = Vec::new();
    for i in 0..3i64 {
        let message = storage.messages.create(&new_message(&format!("message {i}"))).await.unwrap();
        storage
            .messages
            .finalize(
                message.id,
                MessageStatus::Sent,
                Some(base + chrono::Duration::seconds(i)),
                Some(format!("provider-{i}")),
                Some(serde_json::json!({"message": "ok"})),
            )
            .await
            .unwrap();
        ids.push(message.id);
    }

    assert_eq!(storage.messages.count_sent().await.unwrap(), 3);

    let listed = storage.messages.list_sent(10, 0).await.unwrap();
    let listed_ids: Vec<i64> = listed.iter().map(|m| m.id).collect();
    assert_eq!(listed_ids, vec![ids[2], ids[1], ids[0]]);

    let second_page = storage.messages.list_sent(2, 2).await.unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].id, ids[0]);
}

#[tokio::test]
async fn content_length_boundary_is_exact() {
    let _guard = db_lock().lock().await;
    let Some(storage) = test_storage().await else { return };

    let accepted = storage.messages.create(&new_message(&"x".repeat(160))).await.unwrap();
    assert_eq!(accepted.status, MessageStatus::Pending);
    assert_eq!(accepted.content.len(), 160);

    let err = storage.messages.create(&new_message(&"x".repeat(161))).await.unwrap_err();
    assert!(matches!(err, CoreError::ContentTooLong { length: 161 }));
}

#[tokio::test]
async fn invalid_recipient_is_rejected_by_the_store() {
    let _guard = db_lock().lock().await;
    let Some(storage) = test_storage().await else { return };

    let new = NewMessage { to: "not-a-number".to_string(), content: "hello".to_string() };
    let err = storage.messages.create(&new).await.unwrap_err();

    assert!(matches!(err, CoreError::ConstraintViolation(_)), "got: {err:?}");
}
