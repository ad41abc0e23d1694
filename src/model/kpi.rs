use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::calc::increment::PerformanceRating;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Kpi {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub period_end: NaiveDate,
    /// 0.0 - 5.0
    pub score: f64,
    pub rating: String,
    pub comments: Option<String>,
    pub reviewer_id: u64,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

pub const MAX_SCORE: f64 = 5.0;

/// Rating band for a KPI score on the 0-5 scale.
pub fn rating_for(score: f64) -> PerformanceRating {
    match score {
        s if s >= 4.5 => PerformanceRating::Excellent,
        s if s >= 3.5 => PerformanceRating::Good,
        s if s >= 2.5 => PerformanceRating::Average,
        _ => PerformanceRating::BelowAverage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bands() {
        assert_eq!(rating_for(5.0), PerformanceRating::Excellent);
        assert_eq!(rating_for(4.49), PerformanceRating::Good);
        assert_eq!(rating_for(2.5), PerformanceRating::Average);
        assert_eq!(rating_for(0.0), PerformanceRating::BelowAverage);
    }
}
