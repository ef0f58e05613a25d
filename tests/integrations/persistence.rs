//! File-backed stores survive a restart and degrade as documented when
//! their files cannot be written.

#[path = "../helpers/mod.rs"]
mod helpers;

use formhook::delivery_log::LOG_FILE_NAME;
use formhook::registry::REGISTRY_FILE_NAME;
use formhook::{
    DeliveryLog, DeliveryStatus, Dispatcher, FormId, LogStore, MappingStore, NewLogEntry,
    RegistryError, WebhookMapping, WebhookRegistry,
};
use helpers::mock_client::RecordingClient;
use helpers::payload;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

#[tokio::test]
async fn test_registry_reloads_saved_mappings() {
    let dir = tempfile::tempdir().unwrap();
    let mappings = vec![
        WebhookMapping::new(1, "https://a.example.com/hook"),
        WebhookMapping::new(1, "https://b.example.com/hook"),
    ];

    {
        let registry = WebhookRegistry::open(dir.path()).await.unwrap();
        assert!(registry.list().await.is_empty());
        registry.replace(mappings.clone()).await.unwrap();
    }

    let reopened = WebhookRegistry::open(dir.path()).await.unwrap();
    assert_eq!(reopened.list().await, mappings);
}

#[tokio::test]
async fn test_rejected_replace_does_not_touch_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let registry = WebhookRegistry::open(dir.path()).await.unwrap();
    registry
        .replace(vec![WebhookMapping::new(1, "https://a.example.com")])
        .await
        .unwrap();
    let before = std::fs::read_to_string(dir.path().join(REGISTRY_FILE_NAME)).unwrap();

    let result = registry
        .replace(vec![WebhookMapping::new("", "https://b.example.com")])
        .await;

    assert!(matches!(result, Err(RegistryError::Validation(_))));
    let after = std::fs::read_to_string(dir.path().join(REGISTRY_FILE_NAME)).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_invalid_mappings_on_disk_fail_to_open() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(REGISTRY_FILE_NAME),
        r#"[{ "form_id": 3, "webhook_url": "not-a-url" }]"#,
    )
    .unwrap();

    let result = WebhookRegistry::open(dir.path()).await;
    assert!(matches!(result, Err(RegistryError::Validation(ref e)) if e[0].index == 0));
}

#[tokio::test]
async fn test_delivery_log_reloads_entries_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut ids = Vec::new();

    {
        let log = DeliveryLog::open(dir.path()).await.unwrap();
        for (form_id, status) in [(1, DeliveryStatus::Http(200)), (2, DeliveryStatus::Error)] {
            let entry = log
                .append(NewLogEntry {
                    form_id: FormId::from(form_id),
                    status_code: status,
                    payload_json: r#"{"a":1}"#.to_string(),
                })
                .await;
            ids.push(entry.id);
        }
    }

    let reopened = DeliveryLog::open(dir.path()).await.unwrap();
    let entries = reopened.list().await;
    assert_eq!(entries.iter().map(|e| e.id.clone()).collect::<Vec<_>>(), ids);
    assert_eq!(entries[1].status_code, DeliveryStatus::Error);
    assert_eq!(reopened.get(&ids[0]).await.unwrap().payload_json, r#"{"a":1}"#);

    let raw = std::fs::read_to_string(dir.path().join(LOG_FILE_NAME)).unwrap();
    assert!(raw.contains(r#""status_code": "error""#));
}

/// Puts a directory where a store keeps its snapshot file, so every save fails.
fn block_snapshot(path: &Path) {
    if path.is_file() {
        std::fs::remove_file(path).unwrap();
    }
    std::fs::create_dir(path).unwrap();
}

#[tokio::test]
async fn test_failed_registry_save_keeps_previous_mappings() {
    let dir = tempfile::tempdir().unwrap();
    let registry = WebhookRegistry::open(dir.path()).await.unwrap();
    let original = vec![WebhookMapping::new(1, "https://a.example.com")];
    registry.replace(original.clone()).await.unwrap();

    block_snapshot(&dir.path().join(REGISTRY_FILE_NAME));
    let result = registry
        .replace(vec![WebhookMapping::new(2, "https://b.example.com")])
        .await;

    assert!(matches!(result, Err(RegistryError::Persistence(_))));
    assert_eq!(registry.list().await, original);
}

#[tokio::test]
async fn test_failed_log_save_still_records_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let log = DeliveryLog::open(dir.path()).await.unwrap();
    block_snapshot(&dir.path().join(LOG_FILE_NAME));

    let entry = log
        .append(NewLogEntry {
            form_id: FormId::from(6),
            status_code: DeliveryStatus::Http(201),
            payload_json: r#"{"a":1}"#.to_string(),
        })
        .await;

    assert!(entry.id.starts_with("log_"));
    assert_eq!(log.get(&entry.id).await, Some(entry.clone()));
    assert_eq!(log.len().await, 1);
}

#[tokio::test]
async fn test_failed_log_save_does_not_stop_remaining_deliveries() {
    let dir = tempfile::tempdir().unwrap();
    let log = Arc::new(DeliveryLog::open(dir.path()).await.unwrap());
    block_snapshot(&dir.path().join(LOG_FILE_NAME));

    let registry = Arc::new(
        WebhookRegistry::with_mappings(vec![
            WebhookMapping::new(8, "https://a.example.com/"),
            WebhookMapping::new(8, "https://b.example.com/"),
        ])
        .unwrap(),
    );
    let client = RecordingClient::new();
    let dispatcher = Dispatcher::new(registry, log.clone(), Arc::new(client.clone()));

    let results = dispatcher
        .dispatch(&FormId::from(8), &payload(json!({ "name": "Jo" })))
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(client.requests().len(), 2);
    for result in &results {
        assert!(log.get(&result.log_entry_id).await.is_some());
    }
}
