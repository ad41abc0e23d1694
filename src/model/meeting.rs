use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Meeting {
    pub id: u64,
    pub organizer_id: u64,
    pub title: String,
    pub agenda: Option<String>,
    pub room: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub starts_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub ends_at: NaiveDateTime,
}
