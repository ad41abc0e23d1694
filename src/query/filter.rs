use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::{MySqlPool, types::Json};
use tracing::debug;
use utoipa::ToSchema;

use super::value::{SqlValue, ValueKind, to_arguments};
use crate::error::{AppError, AppResult};

pub const DEFAULT_LIMIT: u64 = 50;
pub const MAX_LIMIT: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gte,
    Lte,
    Like,
}

impl Comparison {
    fn sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gte => ">=",
            Comparison::Lte => "<=",
            Comparison::Like => "LIKE",
        }
    }
}

/// One accepted filter key and how it maps onto a column.
#[derive(Debug, Clone, Copy)]
pub struct FilterDef {
    pub key: &'static str,
    pub column: &'static str,
    pub op: Comparison,
    pub kind: ValueKind,
}

impl FilterDef {
    pub const fn new(key: &'static str, column: &'static str, op: Comparison, kind: ValueKind) -> Self {
        Self { key, column, op, kind }
    }
}

/// Everything the builder needs to know about one table.
#[derive(Debug)]
pub struct TableSpec {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub filters: &'static [FilterDef],
    /// Fixed `ORDER BY` column, always descending.
    pub default_sort: &'static str,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QueryRequest {
    /// Columns to project; unknown names are ignored.
    #[serde(default)]
    #[schema(example = json!(["id", "employee_id", "score"]))]
    pub columns: Vec<String>,
    /// Filter key/value pairs; unknown keys are ignored.
    #[serde(default)]
    #[schema(value_type = Object, example = json!({"employee_id": 12, "from_date": "2026-01-01"}))]
    pub filters: Map<String, Value>,
    #[schema(value_type = Option<u64>, example = 20)]
    pub limit: Option<Value>,
    #[schema(value_type = Option<u64>, example = 0)]
    pub offset: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub count_sql: String,
    /// Filter values, shared by both statements.
    pub values: Vec<SqlValue>,
    pub limit: u64,
    pub offset: u64,
}

fn parse_pagination(name: &str, value: Option<&Value>, default: u64) -> AppResult<u64> {
    let Some(value) = value else {
        return Ok(default);
    };
    let parsed = match value {
        Value::Null => return Ok(default),
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AppError::validation(format!("{name} must be a non-negative integer")))
}

impl TableSpec {
    /// Builds the data and count statements for `request`.
    pub fn build(&self, request: &QueryRequest) -> AppResult<BuiltQuery> {
        // Only names taken from the allow-set ever reach the SQL text.
        let mut projected: Vec<&'static str> = Vec::new();
        for requested in &request.columns {
            match self.columns.iter().find(|c| **c == requested.as_str()) {
                Some(column) if !projected.contains(column) => projected.push(column),
                Some(_) => {}
                None => debug!(table = self.table, column = %requested, "Dropping unknown column"),
            }
        }
        if projected.is_empty() {
            return Err(AppError::validation("No valid columns requested"));
        }

        let mut where_sql = String::from(" WHERE 1=1");
        let mut values = Vec::new();

        for (key, raw) in &request.filters {
            let Some(def) = self.filters.iter().find(|f| f.key == key.as_str()) else {
                debug!(table = self.table, filter = %key, "Dropping unknown filter");
                continue;
            };
            if raw.is_null() {
                continue;
            }

            let value = match (def.op, def.kind.coerce(key, raw)?) {
                (Comparison::Like, SqlValue::String(s)) => SqlValue::String(format!("%{s}%")),
                (_, v) => v,
            };
            where_sql.push_str(&format!(" AND {} {} ?", def.column, def.op.sql()));
            values.push(value);
        }

        let limit = parse_pagination("limit", request.limit.as_ref(), DEFAULT_LIMIT)?;
        if limit == 0 || limit > MAX_LIMIT {
            return Err(AppError::validation(format!("limit must be between 1 and {MAX_LIMIT}")));
        }
        let offset = parse_pagination("offset", request.offset.as_ref(), 0)?;

        let json_fields = projected
            .iter()
            .map(|c| format!("'{c}', {c}"))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "SELECT JSON_OBJECT({json_fields}) AS row_data FROM `{table}`{where_sql} ORDER BY {sort} DESC LIMIT ? OFFSET ?",
            table = self.table,
            sort = self.default_sort,
        );
        let count_sql = format!("SELECT COUNT(*) FROM `{}`{}", self.table, where_sql);

        Ok(BuiltQuery {
            sql,
            count_sql,
            values,
            limit,
            offset,
        })
    }
}

#[derive(Debug)]
pub struct QueryPage {
    pub rows: Vec<Value>,
    pub total: i64,
}

impl BuiltQuery {
    pub async fn fetch(&self, pool: &MySqlPool) -> AppResult<QueryPage> {
        debug!(sql = %self.sql, bindings = ?self.values, "Running filtered query");

        let total = sqlx::query_scalar_with::<_, i64, _>(&self.count_sql, to_arguments(&self.values))
            .fetch_one(pool)
            .await?;

        let mut data_values = self.values.clone();
        data_values.push(SqlValue::U64(self.limit));
        data_values.push(SqlValue::U64(self.offset));

        let rows = sqlx::query_as_with::<_, (Json<Value>,), _>(&self.sql, to_arguments(&data_values))
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|(Json(row),)| row)
            .collect();

        Ok(QueryPage { rows, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static KPI_TABLE: TableSpec = TableSpec {
        table: "kpi",
        columns: &["id", "employee_id", "score", "created_at"],
        filters: &[
            FilterDef::new("employee_id", "employee_id", Comparison::Eq, ValueKind::Id),
            FilterDef::new("min_score", "score", Comparison::Gte, ValueKind::Number),
            FilterDef::new("from_date", "period_start", Comparison::Gte, ValueKind::Date),
            FilterDef::new("comments", "comments", Comparison::Like, ValueKind::Text),
        ],
        default_sort: "created_at",
    };

    fn request(v: Value) -> QueryRequest {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn builds_parameterized_select() {
        let built = KPI_TABLE
            .build(&request(json!({
                "columns": ["id", "score"],
                "filters": {"employee_id": 4, "min_score": "3.5"},
                "limit": 10,
                "offset": "20"
            })))
            .unwrap();

        assert_eq!(
            built.sql,
            "SELECT JSON_OBJECT('id', id, 'score', score) AS row_data FROM `kpi` WHERE 1=1 \
             AND employee_id = ? AND score >= ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(built.count_sql, "SELECT COUNT(*) FROM `kpi` WHERE 1=1 AND employee_id = ? AND score >= ?");
        assert_eq!(built.values, vec![SqlValue::U64(4), SqlValue::F64(3.5)]);
        assert_eq!((built.limit, built.offset), (10, 20));
    }

    #[test]
    fn unknown_keys_never_reach_sql() {
        let built = KPI_TABLE
            .build(&request(json!({
                "columns": ["id", "password; DROP TABLE kpi", "id"],
                "filters": {"1=1 OR employee_id": 1, "salary": 5}
            })))
            .unwrap();

        assert!(!built.sql.contains("DROP"));
        assert!(!built.sql.contains(" OR "));
        assert!(!built.sql.contains("employee_id"));
        assert!(!built.sql.contains("salary"));
        assert!(built.values.is_empty());
        assert_eq!(built.sql.matches("'id'").count(), 1);
    }

    #[test]
    fn rejects_empty_projection() {
        let err = KPI_TABLE
            .build(&request(json!({"columns": ["nope"]})))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(KPI_TABLE.build(&QueryRequest::default()).is_err());
    }

    #[test]
    fn rejects_non_numeric_numeric_filter() {
        let err = KPI_TABLE
            .build(&request(json!({"columns": ["id"], "filters": {"min_score": "high"}})))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_malformed_dates_and_pagination() {
        assert!(
            KPI_TABLE.build(&request(json!({"columns": ["id"], "filters": {"from_date": "01-02-2026"}})))
                .is_err()
        );
        assert!(KPI_TABLE.build(&request(json!({"columns": ["id"], "limit": -1}))).is_err());
        assert!(KPI_TABLE.build(&request(json!({"columns": ["id"], "limit": 0}))).is_err());
        assert!(KPI_TABLE.build(&request(json!({"columns": ["id"], "limit": 501}))).is_err());
        assert!(KPI_TABLE.build(&request(json!({"columns": ["id"], "offset": 1.5}))).is_err());
    }

    #[test]
    fn defaults_pagination_and_wraps_like() {
        let built = KPI_TABLE
            .build(&request(json!({"columns": ["id"], "filters": {"comments": "late", "min_score": null}})))
            .unwrap();
        assert_eq!(built.limit, DEFAULT_LIMIT);
        assert_eq!(built.offset, 0);
        assert_eq!(built.values, vec![SqlValue::String("%late%".into())]);
        assert!(built.sql.contains("comments LIKE ?"));
    }
}
