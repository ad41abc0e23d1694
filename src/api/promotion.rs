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
        payroll::apply_salary_change,
    },
    auth::auth::AuthUser,
    calc::salary::SalaryChange,
    error::{AppError, AppResult},
    model::{
        approval::{APPROVAL_STATUSES, Decision, ReviewRequest},
        promotion::Promotion,
        role::Role,
    },
};

const PROMOTION_COLUMNS: &str = "id, employee_id, from_designation, to_designation, salary_increase, \
                                 effective_date, status, requested_by, reviewer_id, reviewed_at, \
                                 comments, created_at";

#[derive(Deserialize, ToSchema)]
pub struct CreatePromotion {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "Senior Technician")]
    pub to_designation: String,
    #[schema(example = 12000.0)]
    pub salary_increase: f64,
    #[schema(example = "2026-07-01", format = "date", value_type = Option<String>)]
    pub effective_date: Option<NaiveDate>,
}

/// HR proposes a promotion; the current designation is taken from the employee.
#[utoipa::path(
    post,
    path = "/api/promotions",
    request_body = CreatePromotion,
    responses(
        (status = 201, description = "Promotion proposed"),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn create_promotion(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePromotion>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Hr])?;

    let to_designation = payload.to_designation.trim();
    if to_designation.is_empty() {
        return Err(AppError::validation("to_designation is required"));
    }
    if !payload.salary_increase.is_finite() || payload.salary_increase < 0.0 {
        return Err(AppError::validation("salary_increase must be zero or more"));
    }

    let employee = fetch_employee(pool.get_ref(), payload.employee_id).await?;
    if employee.status != "active" {
        return Err(AppError::validation("Employee is not active"));
    }
    if employee.designation == to_designation {
        return Err(AppError::validation("Employee already holds that designation"));
    }

    let effective_date = payload
        .effective_date
        .unwrap_or_else(|| Local::now().date_naive());

    let inserted = sqlx::query(
        r#"
        INSERT INTO promotions
        (employee_id, from_designation, to_designation, salary_increase, effective_date, requested_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee.id)
    .bind(&employee.designation)
    .bind(to_designation)
    .bind(payload.salary_increase)
    .bind(effective_date)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await?;

    let id = inserted.last_insert_id();
    info!(id, employee_id = employee.id, to = to_designation, "Promotion proposed");
    Ok(created(json!({ "id": id, "status": "pending" })))
}

#[derive(Deserialize, IntoParams)]
pub struct PromotionFilter {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/promotions",
    params(PromotionFilter),
    responses((status = 200, description = "Paginated promotions", body = Object)),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn list_promotions(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PromotionFilter>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Hr, Role::ManagingDirector])?;
    let (page, per_page, offset) = paginate(query.page, query.per_page);

    let status = query.status.as_deref();
    if let Some(s) = status {
        if !APPROVAL_STATUSES.contains(&s) {
            return Err(AppError::validation("status must be pending, approved or rejected"));
        }
    }
    let where_sql = if status.is_some() { " WHERE status = ?" } else { "" };

    let count_sql = format!("SELECT COUNT(*) FROM promotions{where_sql}");
    let count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    let total = match status {
        Some(s) => count_q.bind(s),
        None => count_q,
    }
    .fetch_one(pool.get_ref())
    .await?;

    let data_sql = format!(
        "SELECT {PROMOTION_COLUMNS} FROM promotions{where_sql} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let data_q = sqlx::query_as::<_, Promotion>(&data_sql);
    let items = match status {
        Some(s) => data_q.bind(s),
        None => data_q,
    }
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

/// Approval moves the employee to the new designation and raises basic pay,
/// together with the review, or not at all.
#[utoipa::path(
    put,
    path = "/api/promotions/{promotion_id}/approve",
    params(("promotion_id" = u64, Path, description = "Promotion ID")),
    request_body(content = ReviewRequest, description = "Optional review comments"),
    responses(
        (status = 200, description = "Promotion approved"),
        (status = 404, description = "Promotion not found"),
        (status = 409, description = "Promotion already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
#[instrument(skip(auth, pool, path, body), fields(user_id = auth.user_id))]
pub async fn approve_promotion(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewRequest>>,
) -> AppResult<HttpResponse> {
    auth.require_md()?;
    let promotion_id = path.into_inner();
    let comments = body.and_then(|b| b.into_inner().comments);

    let mut tx = pool.begin().await?;

    transition(
        &mut tx,
        ApprovalTable::Promotion,
        promotion_id,
        Decision::Approve,
        auth.user_id,
        comments.as_deref(),
    )
    .await?;

    let (employee_id, to_designation, increase, effective_date): (u64, String, f64, NaiveDate) =
        sqlx::query_as(
            "SELECT employee_id, to_designation, salary_increase, effective_date FROM promotions WHERE id = ?",
        )
        .bind(promotion_id)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query("UPDATE employees SET designation = ? WHERE id = ?")
        .bind(&to_designation)
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

    let (salary_id, components) =
        apply_salary_change(&mut tx, employee_id, SalaryChange::BasicRaise(increase), effective_date).await?;

    tx.commit().await?;

    info!(promotion_id, employee_id, salary_id, designation = %to_designation, "Promotion applied");
    Ok(ok(json!({
        "id": promotion_id,
        "status": Decision::Approve.target(),
        "designation": to_designation,
        "total_salary": components.total(),
    })))
}

#[utoipa::path(
    put,
    path = "/api/promotions/{promotion_id}/reject",
    params(("promotion_id" = u64, Path, description = "Promotion ID")),
    request_body(content = ReviewRequest, description = "Optional review comments"),
    responses(
        (status = 200, description = "Promotion rejected"),
        (status = 404, description = "Promotion not found"),
        (status = 409, description = "Promotion already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Promotions"
)]
pub async fn reject_promotion(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewRequest>>,
) -> AppResult<HttpResponse> {
    auth.require_md()?;
    let promotion_id = path.into_inner();
    let comments = body.and_then(|b| b.into_inner().comments);

    let mut conn = pool.acquire().await?;
    transition(
        &mut conn,
        ApprovalTable::Promotion,
        promotion_id,
        Decision::Reject,
        auth.user_id,
        comments.as_deref(),
    )
    .await?;

    Ok(ok(json!({ "id": promotion_id, "status": Decision::Reject.target() })))
}
