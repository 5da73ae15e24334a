//! Tests for SqliteDeviceRepository.

use crate::db::{DataLayer, Database, DbError, DeviceRepository, SqliteDatabase};

async fn setup_db() -> SqliteDatabase {
    let db = SqliteDatabase::in_memory()
        .await
        .expect("Failed to create in-memory database");
    db.migrate().await.expect("Migration should succeed");
    db
}

#[tokio::test(flavor = "multi_thread")]
async fn register_assigns_sequential_ids_and_default_names() {
    let db = setup_db().await;
    let devices = db.devices();

    let first = devices.register(None).await.expect("Register should succeed");
    let second = devices.register(None).await.expect("Register should succeed");

    assert_eq!(first.id, 1);
    assert_eq!(first.name, "TAMS 1");
    assert_eq!(second.id, 2);
    assert_eq!(second.name, "TAMS 2");
    assert_ne!(first.token, second.token);
}

#[tokio::test(flavor = "multi_thread")]
async fn register_keeps_explicit_name() {
    let db = setup_db().await;

    let device = db
        .devices()
        .register(Some("Lecture Hall B"))
        .await
        .expect("Register should succeed");
    assert_eq!(device.name, "Lecture Hall B");

    // Blank names fall back to the default
    let blank = db.devices().register(Some("  ")).await.unwrap();
    assert_eq!(blank.name, "TAMS 2");
}

#[tokio::test(flavor = "multi_thread")]
async fn tokens_are_url_safe_and_43_chars() {
    let db = setup_db().await;
    let device = db.devices().register(None).await.unwrap();

    assert_eq!(device.token.len(), 43);
    assert!(
        device
            .token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn list_is_ordered_by_id() {
    let db = setup_db().await;
    let devices = db.devices();

    assert!(devices.list().await.unwrap().is_empty());

    devices.register(Some("a")).await.unwrap();
    devices.register(Some("b")).await.unwrap();

    let names: Vec<String> = devices.list().await.unwrap().into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn verify_device_checks_token() {
    let db = setup_db().await;
    let device = db.devices().register(None).await.unwrap();

    let found = db.verify_device(&device.token).await.expect("Token should verify");
    assert_eq!(found, device);

    let err = db.verify_device("not-a-token").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}
