//! Conversions between dump JSON values and SQLite columns.

use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};

use crate::db::schema::{Field, FieldKind, PkKind, schema};
use crate::db::{DbError, DbResult, Entity};

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind a JSON scalar with its natural SQLite type.
pub(crate) fn bind_json<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

fn decode_error(column: &str, e: sqlx::Error) -> DbError {
    DbError::Database {
        message: format!("Failed to read column {}: {}", column, e),
    }
}

/// Read a key column (primary or foreign) according to the key flavour.
pub(crate) fn read_key(row: &SqliteRow, column: &str, kind: PkKind) -> DbResult<Value> {
    let value = match kind {
        PkKind::Auto => row
            .try_get::<Option<i64>, _>(column)
            .map_err(|e| decode_error(column, e))?
            .map(Value::from),
        PkKind::Text => row
            .try_get::<Option<String>, _>(column)
            .map_err(|e| decode_error(column, e))?
            .map(Value::from),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Read a column field into its dump representation.
pub(crate) fn read_field(row: &SqliteRow, field: &Field) -> DbResult<Value> {
    let column = field.column;
    let value = match field.kind {
        FieldKind::Int | FieldKind::Choice(_) => row
            .try_get::<Option<i64>, _>(column)
            .map_err(|e| decode_error(column, e))?
            .map(Value::from),
        FieldKind::Text => row
            .try_get::<Option<String>, _>(column)
            .map_err(|e| decode_error(column, e))?
            .map(Value::from),
        FieldKind::Bool => row
            .try_get::<Option<bool>, _>(column)
            .map_err(|e| decode_error(column, e))?
            .map(Value::from),
        FieldKind::ForeignKey(target) => return read_key(row, column, schema(target).pk_kind),
        FieldKind::ManyToMany(_) => None,
    };
    Ok(value.unwrap_or(Value::Null))
}

fn invalid(entity: Entity, name: &str, expected: &str, value: &Value) -> DbError {
    DbError::InvalidData {
        message: format!("{}.{} expects {}, got {}", entity, name, expected, value),
        help: "Check the dump was produced from the same schema version".to_string(),
    }
}

/// Normalize a key value: integers for auto keys, strings for text keys.
pub(crate) fn coerce_key(entity: Entity, name: &str, kind: PkKind, value: &Value) -> DbResult<Value> {
    match (kind, value) {
        (PkKind::Auto, Value::Number(n)) if n.is_i64() => Ok(value.clone()),
        (PkKind::Auto, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid(entity, name, "an integer key", value)),
        (PkKind::Text, Value::String(_)) => Ok(value.clone()),
        (PkKind::Text, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (PkKind::Auto, _) => Err(invalid(entity, name, "an integer key", value)),
        (PkKind::Text, _) => Err(invalid(entity, name, "a text key", value)),
    }
}

/// Check a field value against the column type, converting where the
/// host framework's format is looser (booleans as 0/1).
pub(crate) fn coerce_field(entity: Entity, field: &Field, value: &Value) -> DbResult<Value> {
    if value.is_null() {
        return if field.nullable {
            Ok(Value::Null)
        } else {
            Err(DbError::InvalidData {
                message: format!("{}.{} cannot be null", entity, field.name),
                help: "Provide a value or omit the field to use the column default".to_string(),
            })
        };
    }

    match field.kind {
        FieldKind::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(Value::Bool(false)),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(Value::Bool(true)),
            _ => Err(invalid(entity, field.name, "a boolean", value)),
        },
        FieldKind::Int | FieldKind::Choice(_) => match value {
            Value::Number(n) if n.is_i64() => Ok(value.clone()),
            _ => Err(invalid(entity, field.name, "an integer", value)),
        },
        FieldKind::Text => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(invalid(entity, field.name, "a string", value)),
        },
        FieldKind::ForeignKey(target) => {
            coerce_key(entity, field.name, schema(target).pk_kind, value)
        }
        FieldKind::ManyToMany(_) => Err(invalid(entity, field.name, "a column value", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::schema;
    use serde_json::json;

    fn field(entity: Entity, name: &str) -> &'static Field {
        schema(entity).field(name).unwrap()
    }

    #[test]
    fn booleans_accept_zero_and_one() {
        let f = field(Entity::Course, "elective");
        assert_eq!(coerce_field(Entity::Course, f, &json!(1)).unwrap(), json!(true));
        assert_eq!(coerce_field(Entity::Course, f, &json!(false)).unwrap(), json!(false));
        assert!(coerce_field(Entity::Course, f, &json!("yes")).is_err());
    }

    #[test]
    fn null_only_for_nullable_fields() {
        let alias = field(Entity::Department, "alias");
        let name = field(Entity::Department, "name");
        assert_eq!(coerce_field(Entity::Department, alias, &Value::Null).unwrap(), Value::Null);
        assert!(coerce_field(Entity::Department, name, &Value::Null).is_err());
    }

    #[test]
    fn foreign_keys_follow_target_key_flavour() {
        let student = field(Entity::CourseRegistration, "student");
        let course = field(Entity::CourseRegistration, "course");
        assert_eq!(
            coerce_field(Entity::CourseRegistration, student, &json!("2017/249901")).unwrap(),
            json!("2017/249901")
        );
        assert_eq!(
            coerce_field(Entity::CourseRegistration, course, &json!("12")).unwrap(),
            json!(12)
        );
        assert!(coerce_field(Entity::CourseRegistration, course, &json!("PHY101")).is_err());
    }

    #[test]
    fn text_keys_accept_numbers() {
        assert_eq!(
            coerce_key(Entity::Staff, "pk", PkKind::Text, &json!(1001)).unwrap(),
            json!("1001")
        );
    }
}
