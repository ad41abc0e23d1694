use std::collections::{HashMap, HashSet};

use actix_web::{HttpResponse, web};
use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{created, ok},
    auth::auth::AuthUser,
    calc::{
        payslip::{PayslipInput, month_end, month_start, monthly_payslips, months_of_year, year_to_date},
        salary::{SalaryChange, SalaryComponents},
    },
    config::Config,
    error::{AppError, AppResult},
    model::{contribution::ContributionRow, role::Role, salary::Salary},
};

const SALARY_COLUMNS: &str = "id, employee_id, basic_salary, allowances, ot_pay, increment_pay, \
                              bonus_pay, total_salary, effective_date";

/// The salary row in effect on `as_of`: latest effective date, ties broken by id.
pub async fn current_salary(
    conn: &mut MySqlConnection,
    employee_id: u64,
    as_of: NaiveDate,
    lock: bool,
) -> AppResult<Salary> {
    let sql = format!(
        "SELECT {SALARY_COLUMNS} FROM salary \
         WHERE employee_id = ? AND effective_date <= ? \
         ORDER BY effective_date DESC, id DESC LIMIT 1{}",
        if lock { " FOR UPDATE" } else { "" }
    );

    sqlx::query_as::<_, Salary>(&sql)
        .bind(employee_id)
        .bind(as_of)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("No salary record for employee"))
}

/// Appends a salary row; the total is always derived from the components.
pub async fn insert_salary(
    conn: &mut MySqlConnection,
    employee_id: u64,
    components: &SalaryComponents,
    effective_date: NaiveDate,
) -> AppResult<u64> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO salary
        (employee_id, basic_salary, allowances, ot_pay, increment_pay, bonus_pay, total_salary, effective_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(components.basic_salary)
    .bind(components.allowances)
    .bind(components.ot_pay)
    .bind(components.increment_pay)
    .bind(components.bonus_pay)
    .bind(components.total())
    .bind(effective_date)
    .execute(&mut *conn)
    .await?;

    Ok(inserted.last_insert_id())
}

fn carry_forward_sql(change: SalaryChange) -> String {
    let column = change.column();
    format!(
        "UPDATE salary SET {column} = ROUND({column} + ?, 2), total_salary = ROUND(total_salary + ?, 2) \
         WHERE employee_id = ? AND effective_date > ?"
    )
}

/// Applies `change` from `effective_date` on.
///
/// Inserts a row built from the salary in effect on that date, then adds the
/// same delta to every row dated later so the latest row keeps the change.
/// Returns the new row's id and components.
pub async fn apply_salary_change(
    conn: &mut MySqlConnection,
    employee_id: u64,
    change: SalaryChange,
    effective_date: NaiveDate,
) -> AppResult<(u64, SalaryComponents)> {
    let salary = current_salary(&mut *conn, employee_id, effective_date, true).await?;
    let components = change.apply(&salary.components());
    let salary_id = insert_salary(&mut *conn, employee_id, &components, effective_date).await?;

    let carried = sqlx::query(&carry_forward_sql(change))
        .bind(change.amount())
        .bind(change.amount())
        .bind(employee_id)
        .bind(effective_date)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if carried > 0 {
        debug!(employee_id, salary_id, carried, %effective_date, "Salary change carried to later rows");
    }
    Ok((salary_id, components))
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("month must be YYYY-MM, got {raw:?}")))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Deserialize, IntoParams)]
pub struct PayslipQuery {
    /// `YYYY-MM`, defaults to the current month
    pub month: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/payroll/payslip/{employee_id}",
    params(("employee_id", Path, description = "Employee ID"), PayslipQuery),
    responses(
        (status = 200, description = "Payslip for the month", body = Object, example = json!({
            "success": true,
            "data": {
                "employee_id": 7,
                "month": "2026-03-01",
                "payslip": {
                    "basic_salary": 50000.0,
                    "allowances": {"transport": 150.0, "meal": 100.0, "medical": 75.0, "overtime": 312.5},
                    "deductions": {"epf": 4000.0, "tax": 5000.0, "insurance": 75.0},
                    "gross_salary": 50637.5,
                    "total_deductions": 9075.0,
                    "net_salary": 41562.5
                }
            }
        })),
        (status = 400, description = "Malformed month"),
        (status = 404, description = "No salary record")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn payslip(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<PayslipQuery>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    if !auth.can_view_employee(employee_id) {
        return Err(AppError::forbidden("Not your payslip"));
    }

    let month = match query.month.as_deref() {
        Some(raw) => parse_month(raw)?,
        None => month_start(today()),
    };
    let end = month_end(month);

    let mut conn = pool.acquire().await?;
    let salary = current_salary(&mut conn, employee_id, end, false).await?;

    let overtime: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM ot WHERE employee_id = ? AND date BETWEEN ? AND ?",
    )
    .bind(employee_id)
    .bind(month)
    .bind(end)
    .fetch_one(&mut *conn)
    .await?;

    let stored_epf: Option<f64> =
        sqlx::query_scalar("SELECT epf_employee FROM epfnetf WHERE employee_id = ? AND month = ?")
            .bind(employee_id)
            .bind(month)
            .fetch_optional(&mut *conn)
            .await?;

    let slip = config.payslip_policy.payslip(PayslipInput {
        basic_salary: salary.components().base_pay(),
        overtime,
        stored_epf,
    });

    Ok(ok(json!({ "employee_id": employee_id, "month": month, "payslip": slip })))
}

#[derive(Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

/// Month-by-month payslips for a year plus year-to-date totals.
#[utoipa::path(
    get,
    path = "/api/payroll/summary/{employee_id}",
    params(("employee_id", Path, description = "Employee ID"), SummaryQuery),
    responses(
        (status = 200, description = "Monthly payslips and year-to-date totals", body = Object)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<SummaryQuery>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    if !auth.can_view_employee(employee_id) {
        return Err(AppError::forbidden("Not your payroll summary"));
    }

    let today = today();
    let year = query.year.unwrap_or_else(|| today.year());
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Err(AppError::validation("year is out of range"));
    };

    let history: Vec<(NaiveDate, f64)> = sqlx::query_as(
        r#"
        SELECT effective_date, basic_salary + increment_pay
        FROM salary
        WHERE employee_id = ? AND effective_date <= ?
        ORDER BY effective_date, id
        "#,
    )
    .bind(employee_id)
    .bind(last)
    .fetch_all(pool.get_ref())
    .await?;

    let overtime: HashMap<NaiveDate, f64> = sqlx::query_as::<_, (NaiveDate, f64)>(
        r#"
        SELECT CAST(DATE_FORMAT(date, '%Y-%m-01') AS DATE) AS month, SUM(amount)
        FROM ot
        WHERE employee_id = ? AND date BETWEEN ? AND ?
        GROUP BY month
        "#,
    )
    .bind(employee_id)
    .bind(first)
    .bind(last)
    .fetch_all(pool.get_ref())
    .await?
    .into_iter()
    .collect();

    let epf: HashMap<NaiveDate, f64> = sqlx::query_as::<_, (NaiveDate, f64)>(
        "SELECT month, epf_employee FROM epfnetf WHERE employee_id = ? AND month BETWEEN ? AND ?",
    )
    .bind(employee_id)
    .bind(first)
    .bind(last)
    .fetch_all(pool.get_ref())
    .await?
    .into_iter()
    .collect();

    let months = months_of_year(year, today);
    let slips = monthly_payslips(&config.payslip_policy, &history, &overtime, &epf, &months);
    debug!(employee_id, year, months = slips.len(), "Built payroll summary");

    Ok(ok(json!({
        "employee_id": employee_id,
        "months": slips,
        "year_to_date": year_to_date(year, &slips),
    })))
}

#[utoipa::path(
    get,
    path = "/api/payroll/salary/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses((status = 200, description = "Salary rows, newest first", body = [Salary])),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn salary_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    if !auth.can_view_employee(employee_id) {
        return Err(AppError::forbidden("Not your salary history"));
    }

    let rows = sqlx::query_as::<_, Salary>(&format!(
        "SELECT {SALARY_COLUMNS} FROM salary WHERE employee_id = ? ORDER BY effective_date DESC, id DESC"
    ))
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(ok(rows))
}

#[derive(Deserialize, ToSchema)]
pub struct ContributionBatch {
    #[schema(example = "2026-03")]
    pub month: String,
}

/// EPF/ETF for every active employee. Employees that already have a row for
/// the month are skipped, so re-running a month is safe.
#[utoipa::path(
    post,
    path = "/api/payroll/contributions",
    request_body = ContributionBatch,
    responses(
        (status = 200, description = "Batch committed", body = Object, example = json!({
            "success": true, "data": {"month": "2026-03-01", "created": 14, "skipped": 2}
        })),
        (status = 400, description = "Malformed month"),
        (status = 403, description = "Accountant only")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
#[instrument(skip(auth, pool, config, payload), fields(user_id = auth.user_id, month = %payload.month))]
pub async fn run_contributions(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<ContributionBatch>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Accountant])?;
    let month = parse_month(&payload.month)?;

    let mut tx = pool.begin().await?;

    let employees: Vec<(u64, f64)> = sqlx::query_as(
        r#"
        SELECT e.id, s.basic_salary + s.increment_pay
        FROM employees e
        JOIN salary s ON s.id = (
            SELECT s2.id FROM salary s2
            WHERE s2.employee_id = e.id AND s2.effective_date <= ?
            ORDER BY s2.effective_date DESC, s2.id DESC
            LIMIT 1
        )
        WHERE e.status = 'active'
        ORDER BY e.id
        "#,
    )
    .bind(month_end(month))
    .fetch_all(&mut *tx)
    .await?;

    let existing: HashSet<u64> =
        sqlx::query_scalar::<_, u64>("SELECT employee_id FROM epfnetf WHERE month = ? FOR UPDATE")
            .bind(month)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();

    let mut created_count = 0u32;
    let mut skipped = 0u32;
    for (employee_id, base_pay) in employees {
        if existing.contains(&employee_id) {
            skipped += 1;
            continue;
        }

        let c = config.contribution_policy.contributions(base_pay);
        sqlx::query(
            r#"
            INSERT INTO epfnetf (employee_id, month, basic_salary, epf_employee, epf_employer, etf)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee_id)
        .bind(month)
        .bind(c.basic_salary)
        .bind(c.epf_employee)
        .bind(c.epf_employer)
        .bind(c.etf)
        .execute(&mut *tx)
        .await?;
        created_count += 1;
    }

    tx.commit().await?;

    info!(created = created_count, skipped, "Contribution batch committed");
    Ok(ok(json!({ "month": month, "created": created_count, "skipped": skipped })))
}

#[derive(Deserialize, IntoParams)]
pub struct ContributionQuery {
    /// `YYYY-MM`
    pub month: String,
}

#[utoipa::path(
    get,
    path = "/api/payroll/contributions",
    params(ContributionQuery),
    responses(
        (status = 200, description = "EPF/ETF rows for the month", body = [ContributionRow]),
        (status = 400, description = "Malformed month")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_contributions(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ContributionQuery>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Accountant, Role::ManagingDirector])?;
    let month = parse_month(&query.month)?;

    let rows = sqlx::query_as::<_, ContributionRow>(
        r#"
        SELECT id, employee_id, month, basic_salary, epf_employee, epf_employer, etf
        FROM epfnetf
        WHERE month = ?
        ORDER BY employee_id
        "#,
    )
    .bind(month)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(ok(rows))
}

#[derive(Deserialize, ToSchema)]
pub struct AwardBonus {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = 10000.0)]
    pub amount: f64,
    #[schema(example = "Year-end bonus")]
    pub reason: Option<String>,
    /// Defaults to today
    #[schema(example = "2026-12-20", format = "date", value_type = Option<String>)]
    pub awarded_on: Option<NaiveDate>,
}

/// Records a bonus and the salary row that carries it.
#[utoipa::path(
    post,
    path = "/api/payroll/bonuses",
    request_body = AwardBonus,
    responses(
        (status = 201, description = "Bonus awarded", body = Object, example = json!({
            "success": true, "data": {"id": 3, "salary_id": 41, "total_salary": 65500.0}
        })),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "No salary record")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
#[instrument(skip(auth, pool, payload), fields(user_id = auth.user_id, employee_id = payload.employee_id))]
pub async fn award_bonus(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<AwardBonus>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Accountant, Role::ManagingDirector])?;

    if !payload.amount.is_finite() || payload.amount <= 0.0 {
        return Err(AppError::validation("amount must be greater than zero"));
    }
    let awarded_on = payload.awarded_on.unwrap_or_else(today);

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO bonuses (employee_id, amount, reason, awarded_on, awarded_by) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(payload.employee_id)
    .bind(payload.amount)
    .bind(payload.reason.as_deref())
    .bind(awarded_on)
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await?;

    let (salary_id, components) =
        apply_salary_change(&mut tx, payload.employee_id, SalaryChange::Bonus(payload.amount), awarded_on).await?;

    tx.commit().await?;

    let id = inserted.last_insert_id();
    info!(id, salary_id, "Bonus awarded");
    Ok(created(json!({ "id": id, "salary_id": salary_id, "total_salary": components.total() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_parses_to_first_day() {
        assert_eq!(parse_month("2026-03").unwrap(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(parse_month(" 2026-12 ").unwrap(), NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
    }

    #[test]
    fn later_rows_receive_the_same_delta() {
        assert_eq!(
            carry_forward_sql(SalaryChange::Increment(4_500.0)),
            "UPDATE salary SET increment_pay = ROUND(increment_pay + ?, 2), \
             total_salary = ROUND(total_salary + ?, 2) WHERE employee_id = ? AND effective_date > ?"
        );
        assert!(carry_forward_sql(SalaryChange::Bonus(1.0)).starts_with("UPDATE salary SET bonus_pay = "));
    }

    #[test]
    fn malformed_month_is_rejected() {
        for raw in ["2026-13", "2026", "March", "2026-03-01"] {
            assert!(matches!(parse_month(raw), Err(AppError::Validation(_))), "{raw}");
        }
    }
}
