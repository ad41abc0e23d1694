use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

pub const TASK_STATUSES: &[&str] = &["todo", "in_progress", "done"];

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Task {
    pub id: u64,
    pub assignee_id: u64,
    pub created_by: u64,
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub due_date: Option<NaiveDate>,
    pub status: String,
}
