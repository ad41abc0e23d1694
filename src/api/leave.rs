use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use super::approval::{ApprovalTable, transition};
use crate::{
    api::{Page, created, ok, paginate},
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{
        approval::{APPROVAL_STATUSES, Decision, ReviewRequest},
        leave::{LeaveRequest, LeaveType, leave_days},
        role::Role,
    },
};

const REVIEWERS: &[Role] = &[Role::Manager, Role::Hr, Role::ManagingDirector];

const LEAVE_COLUMNS: &str = "id, employee_id, leave_type, start_date, end_date, reason, status, \
                             reviewer_id, reviewed_at, comments, created_at";

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-02", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType,
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct LeaveFilter {
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    /// pending, approved or rejected
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Submit a leave request for the caller's own employee record.
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(content = CreateLeave, content_type = "application/json"),
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "success": true, "data": {"id": 10, "status": "pending", "days": 2}
        })),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Overlaps an existing request")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(skip(auth, pool, payload), fields(user_id = auth.user_id))]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.employee_id()?;

    if payload.start_date > payload.end_date {
        return Err(AppError::validation("start_date cannot be after end_date"));
    }

    let mut tx = pool.begin().await?;

    // Lock the employee's overlapping live requests until we insert.
    let overlapping: Option<u64> = sqlx::query_scalar(
        r#"
        SELECT id
        FROM leave_requests
        WHERE employee_id = ?
          AND status IN ('pending', 'approved')
          AND start_date <= ?
          AND end_date >= ?
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(employee_id)
    .bind(payload.end_date)
    .bind(payload.start_date)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(existing) = overlapping {
        return Err(AppError::conflict(format!(
            "Overlaps leave request {existing}"
        )));
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO leave_requests (employee_id, leave_type, start_date, end_date, reason)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type.as_ref())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.reason.as_deref())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let id = inserted.last_insert_id();
    info!(id, employee_id, "Leave request submitted");
    Ok(created(json!({
        "id": id,
        "status": "pending",
        "days": leave_days(payload.start_date, payload.end_date),
    })))
}

async fn review(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    leave_id: u64,
    decision: Decision,
    body: Option<web::Json<ReviewRequest>>,
) -> AppResult<HttpResponse> {
    auth.require_any(REVIEWERS)?;

    let comments = body.and_then(|b| b.into_inner().comments);
    let mut conn = pool.acquire().await?;
    transition(
        &mut conn,
        ApprovalTable::Leave,
        leave_id,
        decision,
        auth.user_id,
        comments.as_deref(),
    )
    .await?;

    Ok(ok(json!({ "id": leave_id, "status": decision.target() })))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to approve")),
    request_body(content = ReviewRequest, description = "Optional review comments"),
    responses(
        (status = 200, description = "Leave approved"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewRequest>>,
) -> AppResult<HttpResponse> {
    review(auth, pool, path.into_inner(), Decision::Approve, body).await
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave request to reject")),
    request_body(content = ReviewRequest, description = "Optional review comments"),
    responses(
        (status = 200, description = "Leave rejected"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewRequest>>,
) -> AppResult<HttpResponse> {
    review(auth, pool, path.into_inner(), Decision::Reject, body).await
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let leave_id = path.into_inner();

    let leave = sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?"
    ))
    .bind(leave_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Leave request not found"))?;

    if !auth.can_view_employee(leave.employee_id) {
        return Err(AppError::forbidden("Not your leave request"));
    }

    Ok(ok(leave))
}

/// Employees only ever see their own requests.
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses((status = 200, description = "Paginated leave list", body = Object)),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> AppResult<HttpResponse> {
    let (page, per_page, offset) = paginate(query.page, query.per_page);

    let employee_filter = if auth.role == Role::Employee {
        Some(auth.employee_id()?)
    } else {
        query.employee_id
    };

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<String> = Vec::new();

    if let Some(emp_id) = employee_filter {
        where_sql.push_str(" AND employee_id = ?");
        args.push(emp_id.to_string());
    }

    if let Some(status) = query.status.as_deref() {
        if !APPROVAL_STATUSES.contains(&status) {
            return Err(AppError::validation("status must be pending, approved or rejected"));
        }
        where_sql.push_str(" AND status = ?");
        args.push(status.to_string());
    }

    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = count_q.bind(arg);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {LEAVE_COLUMNS} FROM leave_requests{where_sql} ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    for arg in &args {
        data_q = data_q.bind(arg);
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
