//! In-process dump export and import for SQLite.

use serde_json::{Map, Value};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use super::helpers::{bind_json, coerce_field, coerce_key, read_field, read_key};
use crate::db::schema::{Field, FieldKind, PkKind, TableSchema, schema};
use crate::db::{
    DbError, DbResult, DumpPayload, DumpRecord, Entity, ImportMode, ImportSummary, value_key,
};

/// Export all rows of `entities`, entity by entity in list order, rows
/// ordered by primary key.
pub(crate) async fn export_entities(
    conn: &mut SqliteConnection,
    entities: &[Entity],
) -> DbResult<DumpPayload> {
    let mut records = Vec::new();

    for &entity in entities {
        let table = schema(entity);
        let columns: Vec<&str> = std::iter::once(table.pk_column)
            .chain(table.column_fields().map(|f| f.column))
            .collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            columns.join(", "),
            table.table,
            table.pk_column
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(&format!("Failed to export {}", entity), e))?;

        let exported = rows.len();
        for row in rows {
            let pk = read_key(&row, table.pk_column, table.pk_kind)?;

            let mut fields = Map::new();
            for field in table.column_fields() {
                fields.insert(field.name.to_string(), read_field(&row, field)?);
            }

            for (field, m2m) in table.many_to_many_fields() {
                let sql = format!(
                    "SELECT {target} FROM {table} WHERE {owner} = ? ORDER BY {target}",
                    target = m2m.target_column,
                    table = m2m.table,
                    owner = m2m.owner_column,
                );
                let links = bind_json(sqlx::query(&sql), &pk)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(|e| DbError::from_sqlx(&format!("Failed to export {}", m2m.table), e))?;

                let target_kind = schema(m2m.target).pk_kind;
                let targets = links
                    .iter()
                    .map(|link| read_key(link, m2m.target_column, target_kind))
                    .collect::<DbResult<Vec<_>>>()?;
                fields.insert(field.name.to_string(), Value::Array(targets));
            }

            records.push(DumpRecord {
                model: entity.label(),
                pk,
                fields,
            });
        }

        debug!(entity = %entity, rows = exported, "exported entity");
    }

    Ok(DumpPayload::new(records))
}

/// Apply a payload record by record, in payload order.
///
/// Foreign keys are checked as each row is written, so a payload that lists
/// a child before its parent fails. The caller owns the transaction.
pub(crate) async fn import_payload(
    conn: &mut SqliteConnection,
    payload: &DumpPayload,
    mode: ImportMode,
) -> DbResult<ImportSummary> {
    let mut summary = ImportSummary::default();
    // (entity, pk in the dump) -> pk assigned in this store
    let mut remapped: HashMap<(Entity, String), Value> = HashMap::new();

    for record in &payload.records {
        let entity = record.entity().ok_or_else(|| DbError::UnknownModel {
            model: record.model.clone(),
        })?;
        let table = schema(entity);

        let mut values: Vec<(&'static Field, Value)> = Vec::new();
        for field in table.column_fields() {
            let Some(raw) = record.field(field.name) else {
                continue;
            };
            let mut value = coerce_field(entity, field, raw)?;
            if let FieldKind::ForeignKey(target) = field.kind
                && let Some(local) = remapped.get(&(target, value_key(&value)))
            {
                value = local.clone();
            }
            values.push((field, value));
        }

        let pk = coerce_key(entity, "pk", table.pk_kind, &record.pk)?;
        let merge = mode == ImportMode::Merge
            && table.pk_kind == PkKind::Auto
            && !table.natural_key.is_empty();

        let stored_pk = if merge {
            match find_by_natural_key(conn, table, &values).await? {
                Some(existing) => {
                    if row_matches(conn, table, &existing, &values).await? {
                        summary.skipped += 1;
                    } else {
                        update_row(conn, table, &existing, &values).await?;
                        summary.updated += 1;
                    }
                    existing
                }
                None => {
                    summary.created += 1;
                    insert_row(conn, table, None, &values).await?
                }
            }
        } else if row_exists(conn, table, &pk).await? {
            update_row(conn, table, &pk, &values).await?;
            summary.updated += 1;
            pk.clone()
        } else {
            summary.created += 1;
            insert_row(conn, table, Some(&pk), &values).await?
        };

        if stored_pk != pk {
            remapped.insert((entity, value_key(&pk)), stored_pk.clone());
        }

        replace_links(conn, entity, table, record, &stored_pk, &remapped).await?;

        *summary.entities.entry(entity).or_insert(0) += 1;
    }

    Ok(summary)
}

async fn row_exists(conn: &mut SqliteConnection, table: &TableSchema, pk: &Value) -> DbResult<bool> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?",
        table.table, table.pk_column
    );
    let row = bind_json(sqlx::query(&sql), pk)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(&format!("Failed to look up {}", table.entity), e))?;
    let count: i64 = row.try_get(0).map_err(|e| DbError::from_sqlx("Failed to read count", e))?;
    Ok(count > 0)
}

/// Whether the stored row already holds exactly `values`.
async fn row_matches(
    conn: &mut SqliteConnection,
    table: &TableSchema,
    pk: &Value,
    values: &[(&'static Field, Value)],
) -> DbResult<bool> {
    let conditions: String = values
        .iter()
        .map(|(field, _)| format!(" AND {} IS ?", field.column))
        .collect();
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?{}",
        table.table, table.pk_column, conditions
    );

    let mut query = bind_json(sqlx::query(&sql), pk);
    for (_, value) in values {
        query = bind_json(query, value);
    }

    let row = query
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(&format!("Failed to compare {}", table.entity), e))?;
    let count: i64 = row.try_get(0).map_err(|e| DbError::from_sqlx("Failed to read count", e))?;
    Ok(count > 0)
}

async fn find_by_natural_key(
    conn: &mut SqliteConnection,
    table: &TableSchema,
    values: &[(&'static Field, Value)],
) -> DbResult<Option<Value>> {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();
    for key in table.natural_key {
        let Some(field) = table.field(key) else {
            continue;
        };
        conditions.push(format!("{} IS ?", field.column));
        let value = values
            .iter()
            .find(|(f, _)| f.name == field.name)
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null);
        binds.push(value);
    }

    let sql = format!(
        "SELECT {} FROM {} WHERE {} LIMIT 1",
        table.pk_column,
        table.table,
        conditions.join(" AND ")
    );
    let mut query = sqlx::query(&sql);
    for value in &binds {
        query = bind_json(query, value);
    }

    let row = query
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(&format!("Failed to match {}", table.entity), e))?;

    row.map(|row| read_key(&row, table.pk_column, table.pk_kind))
        .transpose()
}

/// Insert a row, returning its primary key. With no `pk` the store assigns one.
async fn insert_row(
    conn: &mut SqliteConnection,
    table: &TableSchema,
    pk: Option<&Value>,
    values: &[(&'static Field, Value)],
) -> DbResult<Value> {
    let mut columns: Vec<&str> = Vec::new();
    let mut binds: Vec<&Value> = Vec::new();
    if let Some(pk) = pk {
        columns.push(table.pk_column);
        binds.push(pk);
    }
    for (field, value) in values {
        columns.push(field.column);
        binds.push(value);
    }

    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", table.table)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.table,
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        )
    };

    let mut query = sqlx::query(&sql);
    for value in binds {
        query = bind_json(query, value);
    }

    let result = query
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(&format!("Failed to insert {}", table.entity), e))?;

    Ok(match pk {
        Some(pk) => pk.clone(),
        None => Value::from(result.last_insert_rowid()),
    })
}

async fn update_row(
    conn: &mut SqliteConnection,
    table: &TableSchema,
    pk: &Value,
    values: &[(&'static Field, Value)],
) -> DbResult<()> {
    if values.is_empty() {
        return Ok(());
    }

    let assignments: Vec<String> = values
        .iter()
        .map(|(field, _)| format!("{} = ?", field.column))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table.table,
        assignments.join(", "),
        table.pk_column
    );

    let mut query = sqlx::query(&sql);
    for (_, value) in values {
        query = bind_json(query, value);
    }
    query = bind_json(query, pk);

    query
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from_sqlx(&format!("Failed to update {}", table.entity), e))?;
    Ok(())
}

/// Replace the join-table rows of every many-to-many field present in the record.
async fn replace_links(
    conn: &mut SqliteConnection,
    entity: Entity,
    table: &TableSchema,
    record: &DumpRecord,
    owner: &Value,
    remapped: &HashMap<(Entity, String), Value>,
) -> DbResult<()> {
    for (field, m2m) in table.many_to_many_fields() {
        let Some(raw) = record.fields.get(field.name) else {
            continue;
        };
        let targets = match raw {
            Value::Array(items) => items,
            Value::Null => continue,
            other => {
                return Err(DbError::InvalidData {
                    message: format!("{}.{} expects a list, got {}", entity, field.name, other),
                    help: "Many-to-many fields hold a list of related primary keys".to_string(),
                });
            }
        };

        let delete = format!("DELETE FROM {} WHERE {} = ?", m2m.table, m2m.owner_column);
        bind_json(sqlx::query(&delete), owner)
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(&format!("Failed to clear {}", m2m.table), e))?;

        let insert = format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            m2m.table, m2m.owner_column, m2m.target_column
        );
        let target_kind = schema(m2m.target).pk_kind;
        for target in targets {
            let mut target = coerce_key(entity, field.name, target_kind, target)?;
            if let Some(local) = remapped.get(&(m2m.target, value_key(&target))) {
                target = local.clone();
            }
            bind_json(bind_json(sqlx::query(&insert), owner), &target)
                .execute(&mut *conn)
                .await
                .map_err(|e| DbError::from_sqlx(&format!("Failed to link {}", m2m.table), e))?;
        }
    }
    Ok(())
}

pub(crate) async fn count_rows(pool: &SqlitePool, entity: Entity) -> DbResult<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", schema(entity).table);
    let count: i64 = sqlx::query_scalar(&sql)
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::from_sqlx(&format!("Failed to count {}", entity), e))?;
    Ok(count as usize)
}
