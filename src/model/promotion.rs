use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Promotion {
    pub id: u64,
    pub employee_id: u64,
    pub from_designation: String,
    pub to_designation: String,
    pub salary_increase: f64,
    #[schema(value_type = String, format = "date")]
    pub effective_date: NaiveDate,
    pub status: String,
    pub requested_by: u64,
    pub reviewer_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}
