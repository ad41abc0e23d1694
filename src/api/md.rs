use actix_web::{HttpResponse, http::header, web};
use chrono::{Local, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySqlPool, types::Json};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{created, ok},
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{kpi::Kpi, meeting::Meeting, report::Report, role::Role, task::Task},
    report::{self, ReportParams, ReportType, export::to_csv},
};

const RECENT_KPI_ROWS: u32 = 10;

#[derive(Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// Include this employee's open tasks
    pub emp_id: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/md/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Headline counts", body = Object, example = json!({
            "success": true,
            "data": {
                "active_employees": 42,
                "pending_leave": 3,
                "pending_increments": 1,
                "pending_promotions": 0,
                "meetings_today": 2,
                "monthly_payroll": 2315000.0,
                "open_tasks": []
            }
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Managing Director"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DashboardQuery>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::ManagingDirector, Role::Manager])?;
    let today = Local::now().date_naive();

    let (active, pending_leave, pending_increments, pending_promotions, meetings_today): (
        i64,
        i64,
        i64,
        i64,
        i64,
    ) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM employees WHERE status = 'active'),
            (SELECT COUNT(*) FROM leave_requests WHERE status = 'pending'),
            (SELECT COUNT(*) FROM increments WHERE status = 'pending'),
            (SELECT COUNT(*) FROM promotions WHERE status = 'pending'),
            (SELECT COUNT(*) FROM meetings WHERE DATE(starts_at) = ?)
        "#,
    )
    .bind(today)
    .fetch_one(pool.get_ref())
    .await?;

    let monthly_payroll: f64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(s.total_salary), 0)
        FROM employees e
        JOIN salary s ON s.id = (
            SELECT s2.id FROM salary s2
            WHERE s2.employee_id = e.id AND s2.effective_date <= ?
            ORDER BY s2.effective_date DESC, s2.id DESC
            LIMIT 1
        )
        WHERE e.status = 'active'
        "#,
    )
    .bind(today)
    .fetch_one(pool.get_ref())
    .await?;

    let open_tasks = match query.emp_id {
        Some(emp_id) => {
            sqlx::query_as::<_, Task>(
                r#"
                SELECT id, assignee_id, created_by, title, description, due_date, status
                FROM tasks
                WHERE assignee_id = ? AND status <> 'done'
                ORDER BY due_date IS NULL, due_date, id
                "#,
            )
            .bind(emp_id)
            .fetch_all(pool.get_ref())
            .await?
        }
        None => Vec::new(),
    };

    Ok(ok(json!({
        "active_employees": active,
        "pending_leave": pending_leave,
        "pending_increments": pending_increments,
        "pending_promotions": pending_promotions,
        "meetings_today": meetings_today,
        "monthly_payroll": crate::calc::round2(monthly_payroll),
        "open_tasks": open_tasks,
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateMeeting {
    #[schema(example = "Quarterly review")]
    pub title: String,
    pub agenda: Option<String>,
    #[schema(example = "Board room")]
    pub room: Option<String>,
    #[schema(example = "2026-04-02T10:00:00", format = "date-time", value_type = String)]
    pub starts_at: NaiveDateTime,
    #[schema(example = "2026-04-02T11:30:00", format = "date-time", value_type = String)]
    pub ends_at: NaiveDateTime,
}

#[utoipa::path(
    post,
    path = "/api/md/meetings",
    request_body = CreateMeeting,
    responses(
        (status = 201, description = "Meeting scheduled"),
        (status = 400, description = "Missing title or ends_at not after starts_at")
    ),
    security(("bearer_auth" = [])),
    tag = "Managing Director"
)]
pub async fn create_meeting(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateMeeting>,
) -> AppResult<HttpResponse> {
    auth.require_md()?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    if payload.ends_at <= payload.starts_at {
        return Err(AppError::validation("ends_at must be after starts_at"));
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO meetings (organizer_id, title, agenda, room, starts_at, ends_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(title)
    .bind(payload.agenda.as_deref())
    .bind(payload.room.as_deref())
    .bind(payload.starts_at)
    .bind(payload.ends_at)
    .execute(pool.get_ref())
    .await?;

    let id = inserted.last_insert_id();
    info!(id, starts_at = %payload.starts_at, "Meeting scheduled");
    Ok(created(json!({ "id": id })))
}

#[utoipa::path(
    get,
    path = "/api/md/meetings",
    responses((status = 200, description = "Meetings from today on", body = [Meeting])),
    security(("bearer_auth" = [])),
    tag = "Managing Director"
)]
pub async fn upcoming_meetings(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::ManagingDirector, Role::Manager])?;

    let meetings = sqlx::query_as::<_, Meeting>(
        r#"
        SELECT id, organizer_id, title, agenda, room, starts_at, ends_at
        FROM meetings
        WHERE starts_at >= CURDATE()
        ORDER BY starts_at
        LIMIT 100
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(ok(meetings))
}

#[derive(Deserialize, IntoParams)]
pub struct PerformanceQuery {
    /// Account ID; its linked employee's KPI history is returned
    pub user_id: u64,
}

#[utoipa::path(
    get,
    path = "/api/md/performance",
    params(PerformanceQuery),
    responses(
        (status = 200, description = "Recent KPI rows and the all-time average", body = Object),
        (status = 404, description = "Unknown user or no linked employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Managing Director"
)]
pub async fn performance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PerformanceQuery>,
) -> AppResult<HttpResponse> {
    auth.require_md()?;

    let employee_id: Option<u64> =
        sqlx::query_scalar::<_, Option<u64>>("SELECT employee_id FROM users WHERE id = ?")
            .bind(query.user_id)
            .fetch_optional(pool.get_ref())
            .await?
            .flatten();
    let employee_id = employee_id.ok_or_else(|| AppError::not_found("No employee linked to that user"))?;

    let recent = sqlx::query_as::<_, Kpi>(
        r#"
        SELECT id, employee_id, period_start, period_end, score, rating, comments, reviewer_id, created_at
        FROM kpi
        WHERE employee_id = ?
        ORDER BY period_end DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(employee_id)
    .bind(RECENT_KPI_ROWS)
    .fetch_all(pool.get_ref())
    .await?;

    let average: Option<f64> = sqlx::query_scalar("SELECT AVG(score) FROM kpi WHERE employee_id = ?")
        .bind(employee_id)
        .fetch_one(pool.get_ref())
        .await?;

    Ok(ok(json!({
        "employee_id": employee_id,
        "recent": recent,
        "average_score": average.map(crate::calc::round2),
    })))
}

/// Generates a report and stores the shaped rows with its parameters.
#[utoipa::path(
    post,
    path = "/api/md/reports",
    request_body = ReportParams,
    responses(
        (status = 201, description = "Report generated", body = Object, example = json!({
            "success": true,
            "data": {"id": 4, "report_type": "leave", "row_count": 1, "rows": [{"employee_name": "Kamal Perera", "days": 2}]}
        })),
        (status = 400, description = "Unknown report type or bad date range")
    ),
    security(("bearer_auth" = [])),
    tag = "Managing Director"
)]
#[instrument(skip(auth, pool, params), fields(user_id = auth.user_id, report_type = %params.report_type))]
pub async fn generate_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    params: web::Json<ReportParams>,
) -> AppResult<HttpResponse> {
    auth.require_md()?;

    let params = params.into_inner();
    let rows = report::collect(pool.get_ref(), &params).await?;

    let inserted = sqlx::query(
        "INSERT INTO reports (report_type, requested_by, parameters, `rows`) VALUES (?, ?, ?, ?)",
    )
    .bind(params.report_type.as_ref())
    .bind(auth.user_id)
    .bind(Json(&params))
    .bind(Json(&rows))
    .execute(pool.get_ref())
    .await?;

    let id = inserted.last_insert_id();
    info!(id, rows = rows.len(), "Report stored");
    Ok(created(json!({
        "id": id,
        "report_type": params.report_type,
        "row_count": rows.len(),
        "rows": rows,
    })))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Deserialize, IntoParams)]
pub struct ExportQuery {
    /// json (default) or csv
    #[serde(default)]
    #[param(inline)]
    pub format: ExportFormat,
}

#[utoipa::path(
    get,
    path = "/api/md/reports/{report_id}",
    params(("report_id" = u64, Path, description = "Report ID"), ExportQuery),
    responses(
        (status = 200, description = "Stored report as JSON or CSV", body = Report),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Managing Director"
)]
pub async fn get_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<ExportQuery>,
) -> AppResult<HttpResponse> {
    auth.require_md()?;
    let report_id = path.into_inner();

    let stored = sqlx::query_as::<_, Report>(
        "SELECT id, report_type, requested_by, parameters, `rows`, created_at FROM reports WHERE id = ?",
    )
    .bind(report_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Report not found"))?;

    match query.format {
        ExportFormat::Json => Ok(ok(stored)),
        ExportFormat::Csv => {
            let report_type: ReportType = stored
                .report_type
                .parse()
                .map_err(|_| AppError::Internal(format!("stored report has type {:?}", stored.report_type)))?;
            let body = to_csv(report_type.columns(), &stored.rows);

            Ok(HttpResponse::Ok()
                .content_type("text/csv; charset=utf-8")
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{report_type}-report-{report_id}.csv\""),
                ))
                .body(body))
        }
    }
}
