use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{Page, created, ok, paginate, payroll::insert_salary},
    auth::auth::AuthUser,
    calc::salary::SalaryComponents,
    error::{AppError, AppResult, is_duplicate_key},
    model::{
        employee::{EMPLOYEE_STATUSES, Employee, UPDATABLE_COLUMNS},
        role::Role,
    },
    query::update::{build_update_sql, execute_update},
};

const MANAGERS: &[Role] = &[Role::Hr, Role::Manager, Role::ManagingDirector];

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-042")]
    pub employee_code: String,
    #[schema(example = "Kamal")]
    pub first_name: String,
    #[schema(example = "Perera")]
    pub last_name: String,
    #[schema(example = "kamal@company.lk", format = "email")]
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = "Workshop")]
    pub department: String,
    #[schema(example = "Technician")]
    pub designation: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    /// Opening salary; recorded as the first salary row.
    #[schema(example = 85000.0)]
    pub basic_salary: f64,
    #[schema(example = 5000.0)]
    #[serde(default)]
    pub allowances: f64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department: Option<String>,
    pub status: Option<String>,
    /// Matches first name, last name or email
    pub search: Option<String>,
}

/// Hire: inserts the employee and the opening salary row together.
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "success": true, "data": {"id": 42}
        })),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Duplicate employee code or email")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Hr, Role::ManagingDirector])?;

    if payload.first_name.trim().is_empty() || payload.employee_code.trim().is_empty() {
        return Err(AppError::validation("employee_code and first_name are required"));
    }
    if !payload.basic_salary.is_finite() || payload.basic_salary <= 0.0 || payload.allowances < 0.0 {
        return Err(AppError::validation("basic_salary must be positive and allowances non-negative"));
    }

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, first_name, last_name, email, phone, department, designation, hire_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_code.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim())
    .bind(payload.phone.as_deref())
    .bind(&payload.department)
    .bind(&payload.designation)
    .bind(payload.hire_date)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::conflict("Employee code or email already exists")
        } else {
            e.into()
        }
    })?;
    let employee_id = inserted.last_insert_id();

    let components = SalaryComponents {
        basic_salary: payload.basic_salary,
        allowances: payload.allowances,
        ..SalaryComponents::default()
    };
    insert_salary(&mut tx, employee_id, &components, payload.hire_date).await?;

    tx.commit().await?;

    info!(employee_id, created_by = auth.user_id, "Employee created");
    Ok(created(json!({ "id": employee_id })))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = Object)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Hr, Role::Manager, Role::Accountant, Role::ManagingDirector])?;

    let (page, per_page, offset) = paginate(query.page, query.per_page);

    let mut conditions: Vec<&str> = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(department) = &query.department {
        conditions.push("department = ?");
        bindings.push(department.clone());
    }

    if let Some(status) = &query.status {
        if !EMPLOYEE_STATUSES.contains(&status.as_str()) {
            return Err(AppError::validation("status must be active or inactive"));
        }
        conditions.push("status = ?");
        bindings.push(status.clone());
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", search);
        bindings.extend([like.clone(), like.clone(), like]);
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM employees {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        r#"
        SELECT id, employee_code, first_name, last_name, email, phone, department,
               designation, kpi_score, hire_date, status
        FROM employees {}
        ORDER BY id DESC
        LIMIT ? OFFSET ?
        "#,
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    let items = data_query
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

pub async fn fetch_employee(pool: &MySqlPool, employee_id: u64) -> AppResult<Employee> {
    sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, employee_code, first_name, last_name, email, phone, department,
               designation, kpi_score, hire_date, status
        FROM employees
        WHERE id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Employee not found"))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee_id = path.into_inner();
    if !auth.can_view_employee(employee_id) {
        return Err(AppError::forbidden("Not your employee record"));
    }

    Ok(ok(fetch_employee(pool.get_ref(), employee_id).await?))
}

/// Partial update. Keys outside the editable column set are rejected.
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body(content = Object, example = json!({"department": "Finance", "phone": null})),
    responses(
        (status = 200, description = "Employee updated"),
        (status = 400, description = "Unknown or invalid field"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_any(MANAGERS)?;
    let employee_id = path.into_inner();

    let update = build_update_sql("employees", UPDATABLE_COLUMNS, &body, "id", employee_id)?;
    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::conflict("Employee code or email already exists")
        } else {
            e.into()
        }
    })?;

    if affected == 0 {
        // MySQL reports 0 for a no-op update too
        fetch_employee(pool.get_ref(), employee_id).await?;
    }

    info!(employee_id, updated_by = auth.user_id, "Employee updated");
    Ok(ok(json!({ "id": employee_id })))
}

/// Employees are never hard-deleted; this flips status to inactive.
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deactivated"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn deactivate_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Hr, Role::ManagingDirector])?;
    let employee_id = path.into_inner();

    let result = sqlx::query("UPDATE employees SET status = 'inactive' WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        fetch_employee(pool.get_ref(), employee_id).await?;
    }

    info!(employee_id, deactivated_by = auth.user_id, "Employee deactivated");
    Ok(ok(json!({ "id": employee_id, "status": "inactive" })))
}
