//! Report row collection, shaping and export.
//!
//! A report is a snapshot: rows are shaped when the report is requested and
//! stored with it, so later exports return exactly what was generated.

pub mod export;
pub mod shape;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, MySqlPool, mysql::MySqlRow};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    query::value::{SqlValue, to_arguments},
};
use shape::{AttendanceRow, IncrementRow, LeaveRow, PayrollRow};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportType {
    Payroll,
    Attendance,
    Leave,
    Increment,
}

impl ReportType {
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            ReportType::Payroll => PayrollRow::COLUMNS,
            ReportType::Attendance => AttendanceRow::COLUMNS,
            ReportType::Leave => LeaveRow::COLUMNS,
            ReportType::Increment => IncrementRow::COLUMNS,
        }
    }

    fn select(self) -> &'static str {
        match self {
            ReportType::Payroll => {
                "SELECT e.employee_code, e.first_name, e.last_name, e.department, s.effective_date, \
                 s.basic_salary, s.allowances, s.ot_pay, s.increment_pay, s.bonus_pay, s.total_salary \
                 FROM salary s JOIN employees e ON e.id = s.employee_id"
            }
            ReportType::Attendance => {
                "SELECT e.employee_code, e.first_name, e.last_name, e.department, a.date, \
                 a.check_in, a.check_out, a.worked_minutes \
                 FROM attendance a JOIN employees e ON e.id = a.employee_id"
            }
            ReportType::Leave => {
                "SELECT e.employee_code, e.first_name, e.last_name, e.department, l.leave_type, \
                 l.start_date, l.end_date, l.status, l.reason \
                 FROM leave_requests l JOIN employees e ON e.id = l.employee_id"
            }
            ReportType::Increment => {
                "SELECT e.employee_code, e.first_name, e.last_name, e.department, i.increment_type, \
                 i.amount, i.percentage, i.previous_salary, i.new_salary, i.effective_date, i.status \
                 FROM increments i JOIN employees e ON e.id = i.employee_id"
            }
        }
    }

    /// The date the `from`/`to` range applies to.
    fn date_column(self) -> &'static str {
        match self {
            ReportType::Payroll => "s.effective_date",
            ReportType::Attendance => "a.date",
            ReportType::Leave => "l.start_date",
            ReportType::Increment => "i.effective_date",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportParams {
    #[schema(example = "payroll")]
    pub report_type: ReportType,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    #[schema(example = "2026-03-31", format = "date", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    #[schema(example = "Workshop")]
    pub department: Option<String>,
}

/// Upper bound on rows captured in one report.
pub const MAX_ROWS: u32 = 5000;

impl ReportParams {
    pub fn validate(&self) -> AppResult<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(AppError::validation("from cannot be after to"));
            }
        }
        Ok(())
    }

    /// Full statement and its bind values.
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let date_column = self.report_type.date_column();
        let mut sql = format!("{} WHERE 1=1", self.report_type.select());
        let mut values = Vec::new();

        if let Some(from) = self.from {
            sql.push_str(&format!(" AND {date_column} >= ?"));
            values.push(SqlValue::Date(from));
        }
        if let Some(to) = self.to {
            sql.push_str(&format!(" AND {date_column} <= ?"));
            values.push(SqlValue::Date(to));
        }
        if let Some(department) = self.department.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            sql.push_str(" AND e.department = ?");
            values.push(SqlValue::String(department.to_string()));
        }

        sql.push_str(&format!(
            " ORDER BY {date_column} DESC, e.employee_code LIMIT {MAX_ROWS}"
        ));
        (sql, values)
    }
}

async fn fetch_shaped<T>(
    pool: &MySqlPool,
    sql: &str,
    values: &[SqlValue],
    shape: fn(&T) -> Value,
) -> AppResult<Vec<Value>>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    let rows = sqlx::query_as_with::<_, T, _>(sql, to_arguments(values))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(shape).collect())
}

/// Runs the report query and returns shaped rows.
pub async fn collect(pool: &MySqlPool, params: &ReportParams) -> AppResult<Vec<Value>> {
    params.validate()?;
    let (sql, values) = params.to_sql();

    match params.report_type {
        ReportType::Payroll => fetch_shaped(pool, &sql, &values, PayrollRow::shape).await,
        ReportType::Attendance => fetch_shaped(pool, &sql, &values, AttendanceRow::shape).await,
        ReportType::Leave => fetch_shaped(pool, &sql, &values, LeaveRow::shape).await,
        ReportType::Increment => fetch_shaped(pool, &sql, &values, IncrementRow::shape).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(report_type: ReportType) -> ReportParams {
        ReportParams {
            report_type,
            from: None,
            to: None,
            department: None,
        }
    }

    #[test]
    fn unfiltered_report_binds_nothing() {
        let (sql, values) = params(ReportType::Leave).to_sql();
        assert!(sql.contains("FROM leave_requests l"));
        assert!(sql.ends_with(&format!("LIMIT {MAX_ROWS}")));
        assert!(values.is_empty());
    }

    #[test]
    fn range_and_department_filter_the_type_date() {
        let p = ReportParams {
            from: NaiveDate::from_ymd_opt(2026, 1, 1),
            to: NaiveDate::from_ymd_opt(2026, 1, 31),
            department: Some(" Workshop ".into()),
            ..params(ReportType::Attendance)
        };
        let (sql, values) = p.to_sql();
        assert!(sql.contains("a.date >= ? AND a.date <= ? AND e.department = ?"));
        assert_eq!(values.len(), 3);
        assert_eq!(values[2], SqlValue::String("Workshop".into()));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let p = ReportParams {
            from: NaiveDate::from_ymd_opt(2026, 2, 1),
            to: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..params(ReportType::Payroll)
        };
        assert!(matches!(p.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn report_type_parses_from_snake_case() {
        assert_eq!("increment".parse::<ReportType>().unwrap(), ReportType::Increment);
        assert!("salary".parse::<ReportType>().is_err());
        assert_eq!(ReportType::Payroll.columns()[1], "employee_name");
    }
}
