use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

pub const TRAINING_STATUSES: &[&str] = &["planned", "ongoing", "completed", "cancelled"];

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Training {
    pub id: u64,
    pub employee_id: u64,
    pub title: String,
    pub provider: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub status: String,
}
