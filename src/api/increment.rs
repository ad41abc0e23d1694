use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use super::approval::{ApprovalTable, transition};
use crate::{
    api::{
        Page, created,
        employee::fetch_employee,
        ok, paginate,
        payroll::{apply_salary_change, current_salary},
    },
    auth::auth::AuthUser,
    calc::{
        increment::{IncrementInput, IncrementType, PerformanceRating, calculate_increment},
        salary::SalaryChange,
    },
    config::Config,
    error::{AppError, AppResult},
    model::{
        approval::{APPROVAL_STATUSES, Decision, ReviewRequest},
        employee::tenure_months,
        increment::Increment,
        role::Role,
    },
};

const REQUESTERS: &[Role] = &[Role::Accountant, Role::ManagingDirector];
const REVIEWERS: &[Role] = &[Role::ManagingDirector, Role::Hr];

const INCREMENT_COLUMNS: &str = "id, employee_id, increment_type, amount, percentage, previous_salary, \
                                 new_salary, effective_date, status, requested_by, reviewer_id, \
                                 reviewed_at, comments, created_at";

/// Pure preview; nothing is stored.
#[utoipa::path(
    post,
    path = "/api/increments/calculate",
    request_body = IncrementInput,
    responses(
        (status = 200, description = "Suggested increment", body = crate::calc::increment::IncrementSuggestion),
        (status = 400, description = "Unknown type or rating, or non-positive salary")
    ),
    security(("bearer_auth" = [])),
    tag = "Increments"
)]
pub async fn calculate(
    auth: AuthUser,
    config: web::Data<Config>,
    payload: web::Json<IncrementInput>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Accountant, Role::Hr, Role::ManagingDirector])?;

    let suggestion = calculate_increment(&config.increment_policy, &payload)?;
    Ok(ok(suggestion))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateIncrement {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "annual")]
    pub increment_type: IncrementType,
    #[schema(example = "good")]
    pub performance: PerformanceRating,
    #[schema(example = "2026-04-01", format = "date", value_type = Option<String>)]
    pub effective_date: Option<NaiveDate>,
}

/// Requests an increment. Salary and tenure come from the employee's records.
#[utoipa::path(
    post,
    path = "/api/increments",
    request_body = CreateIncrement,
    responses(
        (status = 201, description = "Increment requested", body = Object, example = json!({
            "success": true,
            "data": {"id": 12, "status": "pending", "amount": 4500.0, "percentage": 9.0, "new_salary": 54500.0}
        })),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Employee or salary not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Increments"
)]
#[instrument(skip(auth, pool, config, payload), fields(user_id = auth.user_id, employee_id = payload.employee_id))]
pub async fn create_increment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateIncrement>,
) -> AppResult<HttpResponse> {
    auth.require_any(REQUESTERS)?;

    let today = Local::now().date_naive();
    let effective_date = payload.effective_date.unwrap_or(today);

    let employee = fetch_employee(pool.get_ref(), payload.employee_id).await?;
    if employee.status != "active" {
        return Err(AppError::validation("Employee is not active"));
    }

    let mut conn = pool.acquire().await?;
    let salary = current_salary(&mut conn, employee.id, today, false).await?;
    let previous_salary = salary.components().base_pay();

    let suggestion = calculate_increment(
        &config.increment_policy,
        &IncrementInput {
            current_salary: previous_salary,
            increment_type: payload.increment_type,
            performance: payload.performance,
            tenure_months: tenure_months(employee.hire_date, today),
        },
    )?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO increments
        (employee_id, increment_type, amount, percentage, previous_salary, new_salary, effective_date, requested_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee.id)
    .bind(payload.increment_type.as_ref())
    .bind(suggestion.amount)
    .bind(suggestion.percentage)
    .bind(previous_salary)
    .bind(suggestion.new_salary)
    .bind(effective_date)
    .bind(auth.user_id)
    .execute(&mut *conn)
    .await?;

    let id = inserted.last_insert_id();
    info!(id, amount = suggestion.amount, "Increment requested");
    Ok(created(json!({
        "id": id,
        "status": "pending",
        "amount": suggestion.amount,
        "percentage": suggestion.percentage,
        "new_salary": suggestion.new_salary,
    })))
}

#[derive(Deserialize, IntoParams)]
pub struct IncrementFilter {
    pub employee_id: Option<u64>,
    /// pending, approved or rejected
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/increments",
    params(IncrementFilter),
    responses((status = 200, description = "Paginated increments", body = Object)),
    security(("bearer_auth" = [])),
    tag = "Increments"
)]
pub async fn list_increments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<IncrementFilter>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Accountant, Role::Hr, Role::ManagingDirector])?;
    let (page, per_page, offset) = paginate(query.page, query.per_page);

    let mut where_sql = String::from(" WHERE 1=1");
    let mut employee_arg = None;
    let mut status_arg = None;

    if let Some(employee_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        employee_arg = Some(employee_id);
    }
    if let Some(status) = query.status.as_deref() {
        if !APPROVAL_STATUSES.contains(&status) {
            return Err(AppError::validation("status must be pending, approved or rejected"));
        }
        where_sql.push_str(" AND status = ?");
        status_arg = Some(status);
    }

    let count_sql = format!("SELECT COUNT(*) FROM increments{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(id) = employee_arg {
        count_q = count_q.bind(id);
    }
    if let Some(status) = status_arg {
        count_q = count_q.bind(status);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {INCREMENT_COLUMNS} FROM increments{where_sql} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let mut data_q = sqlx::query_as::<_, Increment>(&data_sql);
    if let Some(id) = employee_arg {
        data_q = data_q.bind(id);
    }
    if let Some(status) = status_arg {
        data_q = data_q.bind(status);
    }
    let items = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(ok(Page {
        items,
        page,
        per_page,
        total,
    }))
}

/// Approval writes the review and the new salary row in one transaction.
#[utoipa::path(
    put,
    path = "/api/increments/{increment_id}/approve",
    params(("increment_id" = u64, Path, description = "Increment ID")),
    request_body(content = ReviewRequest, description = "Optional review comments"),
    responses(
        (status = 200, description = "Increment approved and salary updated"),
        (status = 404, description = "Increment not found"),
        (status = 409, description = "Increment already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Increments"
)]
#[instrument(skip(auth, pool, path, body), fields(user_id = auth.user_id))]
pub async fn approve_increment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewRequest>>,
) -> AppResult<HttpResponse> {
    auth.require_any(REVIEWERS)?;
    let increment_id = path.into_inner();
    let comments = body.and_then(|b| b.into_inner().comments);

    let mut tx = pool.begin().await?;

    transition(
        &mut tx,
        ApprovalTable::Increment,
        increment_id,
        Decision::Approve,
        auth.user_id,
        comments.as_deref(),
    )
    .await?;

    let (employee_id, amount, effective_date): (u64, f64, NaiveDate) =
        sqlx::query_as("SELECT employee_id, amount, effective_date FROM increments WHERE id = ?")
            .bind(increment_id)
            .fetch_one(&mut *tx)
            .await?;

    let (salary_id, components) =
        apply_salary_change(&mut tx, employee_id, SalaryChange::Increment(amount), effective_date).await?;

    tx.commit().await?;

    info!(increment_id, employee_id, salary_id, amount, "Increment applied");
    Ok(ok(json!({
        "id": increment_id,
        "status": Decision::Approve.target(),
        "salary_id": salary_id,
        "total_salary": components.total(),
    })))
}

#[utoipa::path(
    put,
    path = "/api/increments/{increment_id}/reject",
    params(("increment_id" = u64, Path, description = "Increment ID")),
    request_body(content = ReviewRequest, description = "Optional review comments"),
    responses(
        (status = 200, description = "Increment rejected"),
        (status = 404, description = "Increment not found"),
        (status = 409, description = "Increment already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Increments"
)]
pub async fn reject_increment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewRequest>>,
) -> AppResult<HttpResponse> {
    auth.require_any(REVIEWERS)?;
    let increment_id = path.into_inner();
    let comments = body.and_then(|b| b.into_inner().comments);

    let mut conn = pool.acquire().await?;
    transition(
        &mut conn,
        ApprovalTable::Increment,
        increment_id,
        Decision::Reject,
        auth.user_id,
        comments.as_deref(),
    )
    .await?;

    Ok(ok(json!({ "id": increment_id, "status": Decision::Reject.target() })))
}
