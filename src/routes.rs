use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{error::JsonPayloadError, middleware::from_fn, web};
use anyhow::{Result, anyhow};

use crate::{
    api::{attendance, employee, increment, leave, md, payroll, promotion, records, tasks},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::AppError,
};

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-route limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct RateLimiters {
    login: Limiter,
    register: Limiter,
    refresh: Limiter,
    protected: Limiter,
}

fn build_limiter(name: &str, requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = 60_000 / u64::from(requests_per_min);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit for {name}: {requests_per_min}/min"))?;

    Ok(Arc::new(Governor::new(&cfg)))
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter("login", config.rate_login_per_min)?,
            register: build_limiter("register", config.rate_register_per_min)?,
            refresh: build_limiter("refresh", config.rate_refresh_per_min)?,
            protected: build_limiter("protected", config.rate_protected_per_min)?,
        })
    }
}

/// Extractor failures (bad JSON, unknown enum value, malformed path or
/// query) are reported in the same envelope as every other 400.
fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let message = match &err {
            JsonPayloadError::Deserialize(e) => e.to_string(),
            other => other.to_string(),
        };
        AppError::validation(message).into()
    }))
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &RateLimiters) {
    extractor_config(cfg);

    // Public routes; register authenticates through the AuthUser extractor
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(limiters.register.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(limiters.protected.clone())
            .service(handlers::me)
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::deactivate_employee)),
                    ),
            )
            .service(
                web::scope("/leave")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::leave_list))
                            .route(web::post().to(leave::create_leave)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(leave::get_leave)))
                    .service(web::resource("/{id}/approve").route(web::put().to(leave::approve_leave)))
                    .service(web::resource("/{id}/reject").route(web::put().to(leave::reject_leave))),
            )
            .service(
                web::scope("/attendance").service(
                    web::resource("")
                        .route(web::post().to(attendance::check_in))
                        .route(web::put().to(attendance::check_out)),
                ),
            )
            .service(
                web::scope("/increments")
                    .service(
                        web::resource("")
                            .route(web::post().to(increment::create_increment))
                            .route(web::get().to(increment::list_increments)),
                    )
                    .service(web::resource("/calculate").route(web::post().to(increment::calculate)))
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(increment::approve_increment)),
                    )
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(increment::reject_increment)),
                    ),
            )
            .service(
                web::scope("/promotions")
                    .service(
                        web::resource("")
                            .route(web::post().to(promotion::create_promotion))
                            .route(web::get().to(promotion::list_promotions)),
                    )
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(promotion::approve_promotion)),
                    )
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(promotion::reject_promotion)),
                    ),
            )
            .service(
                web::scope("/payroll")
                    .service(web::resource("/payslip/{employee_id}").route(web::get().to(payroll::payslip)))
                    .service(web::resource("/summary/{employee_id}").route(web::get().to(payroll::summary)))
                    .service(
                        web::resource("/salary/{employee_id}").route(web::get().to(payroll::salary_history)),
                    )
                    .service(
                        web::resource("/contributions")
                            .route(web::post().to(payroll::run_contributions))
                            .route(web::get().to(payroll::list_contributions)),
                    )
                    .service(web::resource("/bonuses").route(web::post().to(payroll::award_bonus))),
            )
            .service(
                web::scope("/records")
                    .service(web::resource("/kpi").route(web::post().to(records::create_kpi)))
                    .service(web::resource("/training").route(web::post().to(records::create_training)))
                    .service(web::resource("/{table}/query").route(web::post().to(records::query_records))),
            )
            .service(
                web::scope("/tasks")
                    .service(
                        web::resource("")
                            .route(web::post().to(tasks::create_task))
                            .route(web::get().to(tasks::list_tasks)),
                    )
                    .service(web::resource("/{id}/status").route(web::put().to(tasks::update_task_status))),
            )
            .service(
                web::scope("/md")
                    .service(web::resource("/dashboard").route(web::get().to(md::dashboard)))
                    .service(
                        web::resource("/meetings")
                            .route(web::post().to(md::create_meeting))
                            .route(web::get().to(md::upcoming_meetings)),
                    )
                    .service(web::resource("/performance").route(web::get().to(md::performance)))
                    .service(web::resource("/reports").route(web::post().to(md::generate_report)))
                    .service(web::resource("/reports/{id}").route(web::get().to(md::get_report))),
            ),
    );
}

// LOGIN
//  ├─ access_token (ACCESS_TOKEN_TTL)
//  └─ refresh_token (REFRESH_TOKEN_TTL, stored, rotated on use)
//
// API REQUEST
//  └─ Authorization: Bearer access_token
//
// ACCESS EXPIRED
//  └─ POST /auth/refresh with Authorization: Bearer refresh_token
//       └─ returns a new pair; the old refresh token is revoked

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test as actix_test, web::Data};
    use serde_json::Value;

    use super::*;
    use crate::{
        auth::jwt::{TokenSubject, generate_access_token},
        db::lazy_pool,
        model::role::Role,
    };

    fn app_config() -> (Config, RateLimiters) {
        let mut config = Config::for_tests();
        config.rate_protected_per_min = 1000;
        config.rate_login_per_min = 1000;
        let limiters = RateLimiters::from_config(&config).unwrap();
        (config, limiters)
    }

    fn token(config: &Config, role: Role, employee_id: Option<u64>) -> String {
        let subject = TokenSubject {
            user_id: 1,
            username: "tester".into(),
            role: role.id(),
            employee_id,
        };
        generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl).unwrap()
    }

    macro_rules! app {
        ($config:expr, $limiters:expr) => {{
            let config = $config.clone();
            let limiters = $limiters.clone();
            actix_test::init_service(
                App::new()
                    .app_data(Data::new(lazy_pool()))
                    .app_data(Data::new(config.clone()))
                    .configure(move |cfg| configure(cfg, &config, &limiters)),
            )
            .await
        }};
    }

    #[test]
    fn zero_rate_is_clamped_not_rejected() {
        assert!(build_limiter("test", 0).is_ok());
    }

    #[actix_web::test]
    async fn protected_routes_need_a_token() {
        let (config, limiters) = app_config();
        let app = app!(config, limiters);

        let req = actix_test::TestRequest::get()
            .uri("/api/me")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn me_echoes_the_token_subject() {
        let (config, limiters) = app_config();
        let bearer = token(&config, Role::Hr, Some(4));
        let app = app!(config, limiters);

        let req = actix_test::TestRequest::get()
            .uri("/api/me")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(("Authorization", format!("Bearer {bearer}")))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["data"]["role"], "hr");
        assert_eq!(body["data"]["employee_id"], 4);
    }

    #[actix_web::test]
    async fn role_gate_runs_before_any_query() {
        let (config, limiters) = app_config();
        let bearer = token(&config, Role::Employee, Some(4));
        let app = app!(config, limiters);

        let req = actix_test::TestRequest::post()
            .uri("/api/payroll/contributions")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(("Authorization", format!("Bearer {bearer}")))
            .set_json(serde_json::json!({ "month": "2026-03" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn unknown_enum_value_is_a_400_envelope() {
        let (config, limiters) = app_config();
        let bearer = token(&config, Role::Accountant, None);
        let app = app!(config, limiters);

        let req = actix_test::TestRequest::post()
            .uri("/api/increments/calculate")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(("Authorization", format!("Bearer {bearer}")))
            .set_json(serde_json::json!({
                "current_salary": 50000.0,
                "increment_type": "bogus",
                "performance": "good",
                "tenure_months": 24
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn calculator_scenario_over_http() {
        let (config, limiters) = app_config();
        let bearer = token(&config, Role::Accountant, None);
        let app = app!(config, limiters);

        let req = actix_test::TestRequest::post()
            .uri("/api/increments/calculate")
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .insert_header(("Authorization", format!("Bearer {bearer}")))
            .set_json(serde_json::json!({
                "current_salary": 50000.0,
                "increment_type": "annual",
                "performance": "good",
                "tenure_months": 24
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["data"]["percentage"], 9.0);
        assert_eq!(body["data"]["amount"], 4500.0);
        assert_eq!(body["data"]["new_salary"], 54500.0);
    }
}
