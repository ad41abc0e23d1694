use actix_web::{HttpRequest, HttpResponse, get, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::{
    api::ok,
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, TokenType, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, AppResult, is_duplicate_key},
    model::{role::Role, user::UserSql},
    utils::username_index::UsernameIndex,
};

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "kamal")]
    pub username: String,
    pub password: String,
    #[schema(example = 5)]
    pub role_id: u8,
    #[schema(example = 12)]
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

const MIN_PASSWORD_LEN: usize = 8;

fn token_error(e: jsonwebtoken::errors::Error) -> AppError {
    AppError::Internal(format!("token encoding failed: {e}"))
}

async fn store_refresh_token(pool: &MySqlPool, user_id: u64, jti: &str, exp: usize) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(jti)
    .bind(exp as i64)
    .execute(pool)
    .await?;
    Ok(())
}

async fn issue_pair(pool: &MySqlPool, config: &Config, subject: &TokenSubject) -> AppResult<TokenPair> {
    let access_token = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(token_error)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    debug!(user_id = subject.user_id, jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool, subject.user_id, &refresh_claims.jti, refresh_claims.exp).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Creates a login for a staff member. HR and the MD manage accounts.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn register(
    auth: AuthUser,
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
    index: web::Data<UsernameIndex>,
) -> AppResult<HttpResponse> {
    auth.require_any(&[Role::Hr, Role::ManagingDirector])?;

    let username = user.username.trim().to_lowercase();
    if username.is_empty() || user.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Username is required and password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let role = Role::from_id(user.role_id).ok_or_else(|| AppError::validation("Unknown role_id"))?;
    if role == Role::ManagingDirector && auth.role != Role::ManagingDirector {
        return Err(AppError::forbidden("Only the managing director can grant that role"));
    }

    if !index.is_available(&username, pool.get_ref()).await {
        return Err(AppError::conflict("Username already taken"));
    }

    let hashed = hash_password(&user.password)?;
    let result = sqlx::query(
        r#"INSERT INTO users (username, password, role_id, employee_id) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&username)
    .bind(&hashed)
    .bind(role.id())
    .bind(user.employee_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            index.mark_taken(&username).await;
            info!(%username, %role, created_by = auth.user_id, "User registered");
            Ok(HttpResponse::Created().json(json!({
                "success": true,
                "data": { "username": username, "role": role }
            })))
        }
        Err(e) if is_duplicate_key(&e) => {
            index.mark_taken(&username).await;
            Err(AppError::conflict("Username already exists"))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(AppError::validation("Username or password required"));
    }

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id, employee_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim().to_lowercase())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Database error while fetching user");
        AppError::from(e)
    })?;

    let Some(db_user) = db_user else {
        info!("Invalid credentials: user not found");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&user.password, &db_user.password) {
        info!("Invalid credentials: password mismatch");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let subject = TokenSubject {
        user_id: db_user.id,
        username: db_user.username.clone(),
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };
    let pair = issue_pair(pool.get_ref(), &config, &subject).await?;

    // Non-fatal
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");
    Ok(ok(pair))
}

#[get("/me")]
pub async fn me(auth: AuthUser) -> HttpResponse {
    ok(json!({
        "user_id": auth.user_id,
        "username": auth.username,
        "role": auth.role,
        "employee_id": auth.employee_id,
    }))
}

fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<crate::auth::jwt::Claims> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))?;

    verify_token(token, &config.jwt_secret)
        .ok()
        .filter(|claims| claims.token_type == TokenType::Refresh)
}

/// Rotates a refresh token: the presented one is revoked, a new pair is issued.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let claims = refresh_claims(&req, &config)
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".into()))?;

    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE",
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await?;

    // Unknown or already rotated
    if revoked.rows_affected() == 0 {
        return Err(AppError::Unauthorized("Invalid refresh token".into()));
    }

    let pair = issue_pair(pool.get_ref(), &config, &TokenSubject::from(&claims)).await?;
    Ok(ok(pair))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(claims) = refresh_claims(&req, &config) else {
        return HttpResponse::NoContent().finish();
    };

    // Idempotent
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}
