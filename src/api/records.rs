use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    api::{created, employee::fetch_employee, ok},
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{
        kpi::{MAX_SCORE, rating_for},
        role::Role,
        training::TRAINING_STATUSES,
    },
    query::{filter::QueryRequest, tables},
};

const RECORD_VIEWERS: &[Role] = &[Role::Hr, Role::Manager, Role::ManagingDirector];

/// Filtered query over one of the HR record tables.
#[utoipa::path(
    post,
    path = "/api/records/{table}/query",
    params(("table" = String, Path, description = "kpi, leave, salary or training")),
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Matching rows", body = Object, example = json!({
            "success": true,
            "data": {"table": "kpi", "rows": [{"id": 3, "employee_id": 12, "score": 4.2}], "total": 1, "limit": 50, "offset": 0}
        })),
        (status = 400, description = "Invalid filter value, column list or pagination"),
        (status = 404, description = "Unknown table")
    ),
    security(("bearer_auth" = [])),
    tag = "Records"
)]
pub async fn query_records(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    body: web::Json<QueryRequest>,
) -> AppResult<HttpResponse> {
    auth.require_any(RECORD_VIEWERS)?;

    let name = path.into_inner();
    let spec = tables::lookup(&name).ok_or_else(|| {
        AppError::not_found(format!(
            "Unknown table {name:?}; expected one of {}",
            tables::names().join(", ")
        ))
    })?;

    let built = spec.build(&body)?;
    let page = built.fetch(pool.get_ref()).await?;

    Ok(ok(json!({
        "table": name,
        "rows": page.rows,
        "total": page.total,
        "limit": built.limit,
        "offset": built.offset,
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateKpi {
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub period_start: NaiveDate,
    #[schema(example = "2026-03-31", format = "date", value_type = String)]
    pub period_end: NaiveDate,
    #[schema(example = 4.2)]
    pub score: f64,
    pub comments: Option<String>,
}

/// Records a KPI review and makes its score the employee's current one.
#[utoipa::path(
    post,
    path = "/api/records/kpi",
    request_body = CreateKpi,
    responses(
        (status = 201, description = "KPI recorded", body = Object, example = json!({
            "success": true, "data": {"id": 5, "rating": "good"}
        })),
        (status = 400, description = "Score out of range or bad period"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Records"
)]
pub async fn create_kpi(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateKpi>,
) -> AppResult<HttpResponse> {
    auth.require_any(RECORD_VIEWERS)?;

    if !(0.0..=MAX_SCORE).contains(&payload.score) {
        return Err(AppError::validation(format!("score must be between 0 and {MAX_SCORE}")));
    }
    if payload.period_start > payload.period_end {
        return Err(AppError::validation("period_start cannot be after period_end"));
    }
    fetch_employee(pool.get_ref(), payload.employee_id).await?;

    let rating = rating_for(payload.score);
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO kpi (employee_id, period_start, period_end, score, rating, comments, reviewer_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.period_start)
    .bind(payload.period_end)
    .bind(payload.score)
    .bind(rating.as_ref())
    .bind(payload.comments.as_deref())
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE employees SET kpi_score = ? WHERE id = ?")
        .bind(payload.score)
        .bind(payload.employee_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let id = inserted.last_insert_id();
    info!(id, employee_id = payload.employee_id, score = payload.score, "KPI recorded");
    Ok(created(json!({ "id": id, "rating": rating })))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTraining {
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(example = "Hybrid vehicle diagnostics")]
    pub title: String,
    pub provider: Option<String>,
    #[schema(example = "2026-05-04", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-05-08", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Defaults to `planned`
    pub status: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/records/training",
    request_body = CreateTraining,
    responses(
        (status = 201, description = "Training scheduled"),
        (status = 400, description = "Invalid dates or status"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Records"
)]
pub async fn create_training(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTraining>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Hr, Role::ManagingDirector])?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    if payload.start_date > payload.end_date {
        return Err(AppError::validation("start_date cannot be after end_date"));
    }
    let status = payload.status.as_deref().unwrap_or("planned");
    if !TRAINING_STATUSES.contains(&status) {
        return Err(AppError::validation(format!(
            "status must be one of {}",
            TRAINING_STATUSES.join(", ")
        )));
    }
    fetch_employee(pool.get_ref(), payload.employee_id).await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO training (employee_id, title, provider, start_date, end_date, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(title)
    .bind(payload.provider.as_deref())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(status)
    .execute(pool.get_ref())
    .await?;

    Ok(created(json!({ "id": inserted.last_insert_id(), "status": status })))
}
