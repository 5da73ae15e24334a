use crate::cli::commands::device::*;
use crate::db::{Database, DeviceRepository, NodeDevice, SqliteDatabase};

async fn setup_db() -> SqliteDatabase {
    let db = SqliteDatabase::in_memory()
        .await
        .expect("Failed to create test database");
    db.migrate().await.expect("Failed to run migrations");
    db
}

#[test]
fn test_format_table_empty() {
    assert_eq!(format_table(&[]), "No devices registered.");
}

#[test]
fn test_format_table_truncates_tokens() {
    let devices = vec![NodeDevice {
        id: 1,
        name: "TAMS 1".to_string(),
        token: "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG".to_string(),
    }];

    let output = format_table(&devices);
    assert!(output.contains("TAMS 1"));
    assert!(output.contains("abcdefgh..."));
    assert!(!output.contains("ABCDEFG"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_register_prints_full_token() {
    let db = setup_db().await;

    let output = register(&db, Some("Hall A")).await.unwrap();
    let device = &db.devices().list().await.unwrap()[0];

    assert!(output.starts_with("Registered Hall A (#1)"));
    assert!(output.ends_with(&format!("Token: {}", device.token)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_devices() {
    let db = setup_db().await;
    assert_eq!(list(&db).await.unwrap(), "No devices registered.");

    register(&db, None).await.unwrap();
    register(&db, None).await.unwrap();

    let output = list(&db).await.unwrap();
    assert!(output.contains("TAMS 1"));
    assert!(output.contains("TAMS 2"));
}
