use chrono::{NaiveDate, NaiveTime};
use serde_json::{Value, json};

pub const MISSING: &str = "-";

/// `first last`, tolerating blanks on either side.
pub fn full_name(first: &str, last: &str) -> String {
    let name = [first.trim(), last.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if name.is_empty() { MISSING.to_string() } else { name }
}

fn text_or_missing(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(MISSING)
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(Debug, sqlx::FromRow)]
pub struct PayrollRow {
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub effective_date: NaiveDate,
    pub basic_salary: f64,
    pub allowances: f64,
    pub ot_pay: f64,
    pub increment_pay: f64,
    pub bonus_pay: f64,
    pub total_salary: f64,
}

impl PayrollRow {
    pub const COLUMNS: &'static [&'static str] = &[
        "employee_code",
        "employee_name",
        "department",
        "effective_date",
        "basic_salary",
        "allowances",
        "ot_pay",
        "increment_pay",
        "bonus_pay",
        "total_salary",
    ];

    pub fn shape(&self) -> Value {
        json!({
            "employee_code": self.employee_code,
            "employee_name": full_name(&self.first_name, &self.last_name),
            "department": text_or_missing(Some(&self.department)),
            "effective_date": iso(self.effective_date),
            "basic_salary": self.basic_salary,
            "allowances": self.allowances,
            "ot_pay": self.ot_pay,
            "increment_pay": self.increment_pay,
            "bonus_pay": self.bonus_pay,
            "total_salary": self.total_salary,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub date: NaiveDate,
    pub check_in: NaiveTime,
    pub check_out: Option<NaiveTime>,
    pub worked_minutes: Option<u32>,
}

impl AttendanceRow {
    pub const COLUMNS: &'static [&'static str] = &[
        "employee_code",
        "employee_name",
        "department",
        "date",
        "check_in",
        "check_out",
        "worked_hours",
    ];

    pub fn shape(&self) -> Value {
        let check_out = self
            .check_out
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| MISSING.to_string());
        let worked_hours = self
            .worked_minutes
            .map(|m| crate::calc::round2(f64::from(m) / 60.0))
            .unwrap_or(0.0);

        json!({
            "employee_code": self.employee_code,
            "employee_name": full_name(&self.first_name, &self.last_name),
            "department": text_or_missing(Some(&self.department)),
            "date": iso(self.date),
            "check_in": self.check_in.format("%H:%M").to_string(),
            "check_out": check_out,
            "worked_hours": worked_hours,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct LeaveRow {
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub reason: Option<String>,
}

impl LeaveRow {
    pub const COLUMNS: &'static [&'static str] = &[
        "employee_code",
        "employee_name",
        "department",
        "leave_type",
        "start_date",
        "end_date",
        "days",
        "status",
        "reason",
    ];

    pub fn shape(&self) -> Value {
        json!({
            "employee_code": self.employee_code,
            "employee_name": full_name(&self.first_name, &self.last_name),
            "department": text_or_missing(Some(&self.department)),
            "leave_type": self.leave_type,
            "start_date": iso(self.start_date),
            "end_date": iso(self.end_date),
            "days": crate::model::leave::leave_days(self.start_date, self.end_date),
            "status": self.status,
            "reason": text_or_missing(self.reason.as_deref()),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct IncrementRow {
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub increment_type: String,
    pub amount: f64,
    pub percentage: f64,
    pub previous_salary: f64,
    pub new_salary: f64,
    pub effective_date: NaiveDate,
    pub status: String,
}

impl IncrementRow {
    pub const COLUMNS: &'static [&'static str] = &[
        "employee_code",
        "employee_name",
        "department",
        "increment_type",
        "amount",
        "percentage",
        "previous_salary",
        "new_salary",
        "effective_date",
        "status",
    ];

    pub fn shape(&self) -> Value {
        json!({
            "employee_code": self.employee_code,
            "employee_name": full_name(&self.first_name, &self.last_name),
            "department": text_or_missing(Some(&self.department)),
            "increment_type": self.increment_type,
            "amount": self.amount,
            "percentage": self.percentage,
            "previous_salary": self.previous_salary,
            "new_salary": self.new_salary,
            "effective_date": iso(self.effective_date),
            "status": self.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn names_join_and_default() {
        assert_eq!(full_name("Kamal", "Perera"), "Kamal Perera");
        assert_eq!(full_name(" Kamal ", ""), "Kamal");
        assert_eq!(full_name("", "  "), MISSING);
    }

    #[test]
    fn attendance_without_checkout_is_defaulted() {
        let row = AttendanceRow {
            employee_code: "EMP-1".into(),
            first_name: "Nimal".into(),
            last_name: "Silva".into(),
            department: String::new(),
            date: d(2026, 3, 2),
            check_in: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            check_out: None,
            worked_minutes: None,
        };
        let shaped = row.shape();
        assert_eq!(shaped["employee_name"], "Nimal Silva");
        assert_eq!(shaped["department"], MISSING);
        assert_eq!(shaped["date"], "2026-03-02");
        assert_eq!(shaped["check_in"], "08:30");
        assert_eq!(shaped["check_out"], MISSING);
        assert_eq!(shaped["worked_hours"], 0.0);
    }

    #[test]
    fn leave_row_counts_days_and_defaults_reason() {
        let row = LeaveRow {
            employee_code: "EMP-2".into(),
            first_name: "Ama".into(),
            last_name: "Fernando".into(),
            department: "Finance".into(),
            leave_type: "annual".into(),
            start_date: d(2026, 4, 6),
            end_date: d(2026, 4, 8),
            status: "approved".into(),
            reason: Some("  ".into()),
        };
        let shaped = row.shape();
        assert_eq!(shaped["days"], 3);
        assert_eq!(shaped["reason"], MISSING);
        assert_eq!(shaped["end_date"], "2026-04-08");
    }

    #[test]
    fn every_column_is_produced() {
        let row = PayrollRow {
            employee_code: "EMP-3".into(),
            first_name: "Ruwan".into(),
            last_name: "Jayasuriya".into(),
            department: "Workshop".into(),
            effective_date: d(2026, 1, 1),
            basic_salary: 50_000.0,
            allowances: 0.0,
            ot_pay: 0.0,
            increment_pay: 0.0,
            bonus_pay: 0.0,
            total_salary: 50_000.0,
        };
        let shaped = row.shape();
        for column in PayrollRow::COLUMNS {
            assert!(shaped.get(column).is_some(), "{column}");
        }
    }
}
