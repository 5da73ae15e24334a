//! Tests for SQLite database connection and migrations.

use crate::db::{DataLayer, Database, Entity, SqliteDatabase};

#[tokio::test(flavor = "multi_thread")]
async fn migrate_creates_all_tables() {
    let db = SqliteDatabase::in_memory()
        .await
        .expect("Failed to create in-memory database");

    db.migrate().await.expect("Migration should succeed");

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(db.pool())
            .await
            .expect("Query should succeed");

    let expected = [
        "_sqlx_migrations",
        "academic_session",
        "app_user",
        "attendance_record",
        "attendance_session",
        "course",
        "course_registration",
        "department",
        "faculty",
        "node_device",
        "staff",
        "staff_staff_titles",
        "staff_title",
        "student",
    ];

    for table in &expected {
        assert!(
            tables.iter().any(|t| t == table),
            "Missing table: {}. Found tables: {:?}",
            table,
            tables
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn migrate_is_idempotent() {
    let db = SqliteDatabase::in_memory().await.unwrap();
    db.migrate().await.expect("First migration should succeed");
    db.migrate().await.expect("Second migration should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn foreign_keys_are_enforced() {
    let db = SqliteDatabase::in_memory().await.unwrap();
    db.migrate().await.unwrap();

    let result = sqlx::query("INSERT INTO department (name, faculty_id) VALUES ('Physics', 99)")
        .execute(db.pool())
        .await;
    assert!(result.is_err(), "Orphan department should be rejected");
}

#[tokio::test(flavor = "multi_thread")]
async fn open_creates_database_file() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("tams.db");

    let db = SqliteDatabase::open(&path).await.expect("Open should succeed");
    db.migrate().await.unwrap();

    assert!(path.exists());
    let counts = db.counts().await.unwrap();
    assert_eq!(counts.len(), Entity::ALL.len());
    assert!(counts.values().all(|&n| n == 0));
}
