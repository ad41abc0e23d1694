use serde_json::Value;
use sqlx::MySqlPool;

use super::value::{SqlValue, ValueKind, to_arguments};
use crate::error::{AppError, AppResult};

/// A column that may be changed through a partial update.
#[derive(Debug, Clone, Copy)]
pub struct UpdatableColumn {
    pub name: &'static str,
    pub kind: ValueKind,
    pub nullable: bool,
}

impl UpdatableColumn {
    pub const fn new(name: &'static str, kind: ValueKind) -> Self {
        Self { name, kind, nullable: false }
    }

    pub const fn nullable(name: &'static str, kind: ValueKind) -> Self {
        Self { name, kind, nullable: true }
    }
}

#[derive(Debug, PartialEq)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Builds `UPDATE table SET a = ?, b = ? WHERE id_column = ?` from a JSON
/// object. Unknown keys are rejected, not dropped.
pub fn build_update_sql(
    table: &str,
    columns: &[UpdatableColumn],
    payload: &Value,
    id_column: &str,
    id_value: u64,
) -> AppResult<SqlUpdate> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::validation("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(AppError::validation("No fields provided for update"));
    }

    let mut assignments = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let column = columns
            .iter()
            .find(|c| c.name == key.as_str())
            .ok_or_else(|| AppError::validation(format!("Field {key} cannot be updated")))?;

        let bound = if value.is_null() {
            if !column.nullable {
                return Err(AppError::validation(format!("{key} cannot be null")));
            }
            SqlValue::Null
        } else {
            column.kind.coerce(key, value)?
        };

        assignments.push(format!("{} = ?", column.name));
        values.push(bound);
    }

    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = ?",
            table,
            assignments.join(", "),
            id_column
        ),
        values,
    })
}

pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let result = sqlx::query_with(&update.sql, to_arguments(&update.values))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[UpdatableColumn] = &[
        UpdatableColumn::new("first_name", ValueKind::Text),
        UpdatableColumn::nullable("phone", ValueKind::Text),
        UpdatableColumn::new("status", ValueKind::OneOf(&["active", "inactive"])),
    ];

    #[test]
    fn builds_update_for_known_columns() {
        let update = build_update_sql(
            "employees",
            COLUMNS,
            &json!({"first_name": "Nimal", "phone": null}),
            "id",
            9,
        )
        .unwrap();

        assert_eq!(update.sql, "UPDATE employees SET first_name = ?, phone = ? WHERE id = ?");
        assert_eq!(
            update.values,
            vec![SqlValue::String("Nimal".into()), SqlValue::Null, SqlValue::U64(9)]
        );
    }

    #[test]
    fn rejects_unknown_and_invalid_fields() {
        assert!(build_update_sql("employees", COLUMNS, &json!({"id = 1; --": 1}), "id", 1).is_err());
        assert!(build_update_sql("employees", COLUMNS, &json!({"status": "fired"}), "id", 1).is_err());
        assert!(build_update_sql("employees", COLUMNS, &json!({"first_name": null}), "id", 1).is_err());
        assert!(build_update_sql("employees", COLUMNS, &json!({}), "id", 1).is_err());
        assert!(build_update_sql("employees", COLUMNS, &json!([1, 2]), "id", 1).is_err());
    }
}
