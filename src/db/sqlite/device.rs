//! SQLite DeviceRepository implementation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::db::{DbError, DbResult, DeviceRepository, NodeDevice, default_device_name};

/// SQLx-backed node device registry.
pub struct SqliteDeviceRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

/// 32 random bytes, URL-safe base64 without padding (43 characters).
pub(crate) fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

impl<'a> DeviceRepository for SqliteDeviceRepository<'a> {
    async fn register(&self, name: Option<&str>) -> DbResult<NodeDevice> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::from_sqlx("Failed to begin transaction", e))?;

        let id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM node_device WHERE id > 0")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DbError::from_sqlx("Failed to allocate device id", e))?;

        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_device_name(id),
        };
        let token = generate_token();

        sqlx::query("INSERT INTO node_device (id, name, token) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&name)
            .bind(&token)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from_sqlx("Failed to register device", e))?;

        tx.commit()
            .await
            .map_err(|e| DbError::from_sqlx("Failed to commit device registration", e))?;

        info!(id, name = %name, "registered node device");
        Ok(NodeDevice { id, name, token })
    }

    async fn list(&self) -> DbResult<Vec<NodeDevice>> {
        let rows = sqlx::query("SELECT id, name, token FROM node_device ORDER BY id")
            .fetch_all(self.pool)
            .await
            .map_err(|e| DbError::from_sqlx("Failed to list devices", e))?;

        Ok(rows
            .into_iter()
            .map(|row| NodeDevice {
                id: row.get("id"),
                name: row.get("name"),
                token: row.get("token"),
            })
            .collect())
    }

    async fn find_by_token(&self, token: &str) -> DbResult<Option<NodeDevice>> {
        let row = sqlx::query("SELECT id, name, token FROM node_device WHERE token = ?")
            .bind(token)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| DbError::from_sqlx("Failed to look up device", e))?;

        Ok(row.map(|row| NodeDevice {
            id: row.get("id"),
            name: row.get("name"),
            token: row.get("token"),
        }))
    }
}
