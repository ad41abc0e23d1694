use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;
use utoipa::ToSchema;

pub const LEAVE_TYPES: &[&str] = &["annual", "sick", "casual", "unpaid"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Casual,
    Unpaid,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "sick")]
    pub leave_type: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    #[schema(example = "pending")]
    pub status: String,
    pub reviewer_id: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = Option<String>)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Inclusive day count of a leave range.
pub fn leave_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_match_allow_list() {
        for t in [LeaveType::Annual, LeaveType::Sick, LeaveType::Casual, LeaveType::Unpaid] {
            assert!(LEAVE_TYPES.contains(&t.as_ref()));
        }
    }

    #[test]
    fn day_count_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        assert_eq!(leave_days(d(2), d(2)), 1);
        assert_eq!(leave_days(d(2), d(6)), 5);
    }
}
