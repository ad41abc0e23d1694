use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use super::jwt::{TokenType, verify_token};
use crate::{
    config::Config,
    error::{AppError, AppResult},
    model::role::Role,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

fn bearer_token(req: &HttpRequest) -> AppResult<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))
}

fn authenticate(req: &HttpRequest) -> AppResult<AuthUser> {
    // Set by the auth middleware on protected scopes.
    if let Some(user) = req.extensions().get::<AuthUser>() {
        return Ok(user.clone());
    }

    let token = bearer_token(req)?;
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| AppError::Internal("Config missing".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;
    if claims.token_type != TokenType::Access {
        return Err(AppError::Unauthorized("Access token required".into()));
    }

    let role = Role::from_id(claims.role).ok_or_else(|| AppError::Unauthorized("Invalid role".into()))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(Into::into))
    }
}

impl AuthUser {
    pub fn require_any(&self, roles: &[Role]) -> AppResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            let allowed = roles.iter().map(Role::to_string).collect::<Vec<_>>().join("/");
            Err(AppError::forbidden(format!("{allowed} only")))
        }
    }

    pub fn require_md(&self) -> AppResult<()> {
        self.require_any(&[Role::ManagingDirector])
    }

    /// The linked employee record, required for self-service actions.
    pub fn employee_id(&self) -> AppResult<u64> {
        self.employee_id
            .ok_or_else(|| AppError::forbidden("No employee profile"))
    }

    /// Whether this user may read `employee_id`'s records.
    pub fn can_view_employee(&self, employee_id: u64) -> bool {
        self.employee_id == Some(employee_id) || self.role != Role::Employee
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn role_guard() {
        let hr = user(Role::Hr, None);
        assert!(hr.require_any(&[Role::Hr, Role::ManagingDirector]).is_ok());
        let err = hr.require_md().unwrap_err();
        assert!(matches!(err, AppError::Forbidden(m) if m == "managing_director only"));
    }

    #[test]
    fn employees_only_see_themselves() {
        let emp = user(Role::Employee, Some(3));
        assert!(emp.can_view_employee(3));
        assert!(!emp.can_view_employee(4));
        assert!(user(Role::Accountant, None).can_view_employee(4));
        assert!(user(Role::Hr, None).employee_id().is_err());
    }
}
