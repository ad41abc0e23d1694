use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Bonus {
    pub id: u64,
    pub employee_id: u64,
    pub amount: f64,
    pub reason: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub awarded_on: NaiveDate,
    pub awarded_by: u64,
}
