use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::query::{update::UpdatableColumn, value::ValueKind};

pub const EMPLOYEE_STATUSES: &[&str] = &["active", "inactive"];

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "Kamal",
        "last_name": "Perera",
        "email": "kamal.perera@company.lk",
        "phone": "+94771234567",
        "department": "Workshop",
        "designation": "Technician",
        "kpi_score": 3.8,
        "hire_date": "2024-01-01",
        "status": "active"
    })
)]
pub struct Employee {
    pub id: u64,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department: String,
    pub designation: String,
    pub kpi_score: Option<f64>,
    #[schema(value_type = String, format = "date")]
    pub hire_date: NaiveDate,
    pub status: String,
}

/// Designation moves only through approved promotions and status only
/// through deactivation.
pub const UPDATABLE_COLUMNS: &[UpdatableColumn] = &[
    UpdatableColumn::new("employee_code", ValueKind::Text),
    UpdatableColumn::new("first_name", ValueKind::Text),
    UpdatableColumn::new("last_name", ValueKind::Text),
    UpdatableColumn::new("email", ValueKind::Text),
    UpdatableColumn::nullable("phone", ValueKind::Text),
    UpdatableColumn::new("department", ValueKind::Text),
    UpdatableColumn::nullable("kpi_score", ValueKind::Number),
    UpdatableColumn::new("hire_date", ValueKind::Date),
];

/// Whole months between `hire_date` and `today`; zero for future hires.
pub fn tenure_months(hire_date: NaiveDate, today: NaiveDate) -> u32 {
    use chrono::Datelike;

    let mut months = (today.year() - hire_date.year()) * 12 + today.month() as i32
        - hire_date.month() as i32;
    if today.day() < hire_date.day() {
        months -= 1;
    }
    u32::try_from(months).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn tenure_counts_completed_months() {
        assert_eq!(tenure_months(d(2024, 1, 15), d(2026, 1, 15)), 24);
        assert_eq!(tenure_months(d(2024, 1, 15), d(2026, 1, 14)), 23);
        assert_eq!(tenure_months(d(2026, 5, 1), d(2026, 1, 1)), 0);
    }

    #[test]
    fn designation_and_status_are_not_directly_editable() {
        use crate::query::update::build_update_sql;
        use serde_json::json;

        for body in [json!({"designation": "Manager"}), json!({"status": "inactive"})] {
            assert!(build_update_sql("employees", UPDATABLE_COLUMNS, &body, "id", 3).is_err(), "{body}");
        }
        assert!(build_update_sql("employees", UPDATABLE_COLUMNS, &json!({"department": "Finance"}), "id", 3).is_ok());
    }
}
