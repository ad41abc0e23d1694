use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveTime};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{info, instrument};

use crate::{
    api::ok,
    auth::auth::AuthUser,
    config::Config,
    error::{AppError, AppResult, is_duplicate_key},
    model::attendance::worked_minutes,
};

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "success": true, "data": {"check_in": "08:29:51"}
        })),
        (status = 403, description = "No active employee profile"),
        (status = 409, description = "Already checked in today")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(auth, pool), fields(user_id = auth.user_id))]
pub async fn check_in(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let employee_id = auth.employee_id()?;
    let now = Local::now().naive_local();

    let mut tx = pool.begin().await?;

    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM employees WHERE id = ? FOR UPDATE")
            .bind(employee_id)
            .fetch_optional(&mut *tx)
            .await?;
    if status.as_deref() != Some("active") {
        return Err(AppError::forbidden("No active employee profile"));
    }

    sqlx::query("INSERT INTO attendance (employee_id, date, check_in) VALUES (?, ?, ?)")
        .bind(employee_id)
        .bind(now.date())
        .bind(now.time())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::conflict("Already checked in today")
            } else {
                e.into()
            }
        })?;

    tx.commit().await?;

    info!(employee_id, "Checked in");
    Ok(ok(json!({ "date": now.date(), "check_in": now.time().format("%H:%M:%S").to_string() })))
}

/// Check-out endpoint. Time beyond the standard day is booked as overtime.
#[utoipa::path(
    put,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "success": true, "data": {"worked_minutes": 545, "overtime_hours": 1.08}
        })),
        (status = 400, description = "No active check-in found for today")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(skip(auth, pool, config), fields(user_id = auth.user_id))]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let employee_id = auth.employee_id()?;
    let now = Local::now().naive_local();

    let mut tx = pool.begin().await?;

    let open: Option<(u64, NaiveTime)> = sqlx::query_as(
        r#"
        SELECT id, check_in
        FROM attendance
        WHERE employee_id = ? AND date = ? AND check_out IS NULL
        FOR UPDATE
        "#,
    )
    .bind(employee_id)
    .bind(now.date())
    .fetch_optional(&mut *tx)
    .await?;

    let Some((attendance_id, check_in)) = open else {
        return Err(AppError::validation("No active check-in found for today"));
    };

    let minutes = worked_minutes(check_in, now.time());
    sqlx::query("UPDATE attendance SET check_out = ?, worked_minutes = ? WHERE id = ?")
        .bind(now.time())
        .bind(minutes)
        .bind(attendance_id)
        .execute(&mut *tx)
        .await?;

    let base_pay: Option<f64> = sqlx::query_scalar(
        r#"
        SELECT basic_salary + increment_pay
        FROM salary
        WHERE employee_id = ? AND effective_date <= ?
        ORDER BY effective_date DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .bind(now.date())
    .fetch_optional(&mut *tx)
    .await?;

    let overtime = base_pay.and_then(|pay| config.overtime_policy.overtime_for(minutes, pay));
    if let Some(entry) = &overtime {
        sqlx::query("INSERT INTO ot (employee_id, date, hours, rate, amount) VALUES (?, ?, ?, ?, ?)")
            .bind(employee_id)
            .bind(now.date())
            .bind(entry.hours)
            .bind(entry.rate)
            .bind(entry.amount)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!(employee_id, minutes, overtime = overtime.is_some(), "Checked out");
    Ok(ok(json!({
        "worked_minutes": minutes,
        "overtime_hours": overtime.as_ref().map(|e| e.hours).unwrap_or(0.0),
        "overtime_amount": overtime.as_ref().map(|e| e.amount).unwrap_or(0.0),
    })))
}
