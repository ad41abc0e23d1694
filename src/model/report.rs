use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Report {
    pub id: u64,
    pub report_type: String,
    pub requested_by: u64,
    #[schema(value_type = Object)]
    pub parameters: Json<Value>,
    #[schema(value_type = Vec<Object>)]
    pub rows: Json<Vec<Value>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}
