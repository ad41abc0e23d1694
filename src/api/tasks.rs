use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{created, employee::fetch_employee, ok},
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{
        role::Role,
        task::{TASK_STATUSES, Task},
    },
};

const TASK_COLUMNS: &str = "id, assignee_id, created_by, title, description, due_date, status";

fn check_status(status: &str) -> AppResult<()> {
    if TASK_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "status must be one of {}",
            TASK_STATUSES.join(", ")
        )))
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTask {
    #[schema(example = 12)]
    pub assignee_id: u64,
    #[schema(example = "Prepare Q2 workshop roster")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "2026-06-30", format = "date", value_type = Option<String>)]
    pub due_date: Option<NaiveDate>,
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task assigned"),
        (status = 404, description = "Assignee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn create_task(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTask>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Manager, Role::Hr, Role::ManagingDirector])?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    fetch_employee(pool.get_ref(), payload.assignee_id).await?;

    let inserted = sqlx::query(
        "INSERT INTO tasks (assignee_id, created_by, title, description, due_date) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(payload.assignee_id)
    .bind(auth.user_id)
    .bind(title)
    .bind(payload.description.as_deref())
    .bind(payload.due_date)
    .execute(pool.get_ref())
    .await?;

    let id = inserted.last_insert_id();
    info!(id, assignee_id = payload.assignee_id, "Task assigned");
    Ok(created(json!({ "id": id, "status": "todo" })))
}

#[derive(Deserialize, IntoParams)]
pub struct TaskFilter {
    /// Ignored for employees, who only see their own tasks
    pub assignee_id: Option<u64>,
    pub status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskFilter),
    responses((status = 200, description = "Tasks, soonest due first", body = [Task])),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn list_tasks(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TaskFilter>,
) -> AppResult<HttpResponse> {
    let assignee = match auth.role {
        Role::Employee => Some(auth.employee_id()?),
        _ => query.assignee_id.or(auth.employee_id),
    };

    let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1=1");
    if assignee.is_some() {
        sql.push_str(" AND assignee_id = ?");
    }
    if let Some(status) = query.status.as_deref() {
        check_status(status)?;
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" ORDER BY due_date IS NULL, due_date, id");

    let mut q = sqlx::query_as::<_, Task>(&sql);
    if let Some(id) = assignee {
        q = q.bind(id);
    }
    if let Some(status) = query.status.as_deref() {
        q = q.bind(status);
    }
    let tasks = q.fetch_all(pool.get_ref()).await?;

    Ok(ok(tasks))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateTaskStatus {
    #[schema(example = "in_progress")]
    pub status: String,
}

/// The assignee or the task's creator may move it between statuses.
#[utoipa::path(
    put,
    path = "/api/tasks/{task_id}/status",
    params(("task_id" = u64, Path, description = "Task ID")),
    request_body = UpdateTaskStatus,
    responses(
        (status = 200, description = "Status updated"),
        (status = 403, description = "Not your task"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn update_task_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateTaskStatus>,
) -> AppResult<HttpResponse> {
    let task_id = path.into_inner();
    check_status(&payload.status)?;

    let (assignee_id, created_by): (u64, u64) =
        sqlx::query_as("SELECT assignee_id, created_by FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(pool.get_ref())
            .await?
            .ok_or_else(|| AppError::not_found("Task not found"))?;

    if auth.employee_id != Some(assignee_id) && auth.user_id != created_by {
        return Err(AppError::forbidden("Not your task"));
    }

    sqlx::query("UPDATE tasks SET status = ? WHERE id = ?")
        .bind(&payload.status)
        .bind(task_id)
        .execute(pool.get_ref())
        .await?;

    info!(task_id, status = %payload.status, "Task status updated");
    Ok(ok(json!({ "id": task_id, "status": payload.status })))
}
