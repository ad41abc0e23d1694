use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, get};
use anyhow::Context;
use dotenvy::dotenv;
use serde_json::json;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod auth;
mod calc;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod query;
mod report;
mod routes;
mod utils;

use config::Config;
use db::init_db;
use docs::ApiDoc;
use routes::RateLimiters;
use utils::username_index::UsernameIndex;

#[get("/health")]
async fn health() -> HttpResponse {
    api::ok(json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, prefix = %config.api_prefix, "Server starting");

    let pool = init_db(&config)
        .await
        .context("failed to connect to the database")?;

    let username_index = Data::new(UsernameIndex::default());
    {
        let index = username_index.clone();
        let pool = pool.clone();
        actix_web::rt::spawn(async move {
            // Last 30 days of sign-ins go into the cache, everything into the filter
            if let Err(e) = index.warmup(&pool, 30, 250).await {
                warn!(error = ?e, "Username index warmup failed");
            }
        });
    }

    let limiters = RateLimiters::from_config(&config)?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        let routes_config = config.clone();
        let routes_limiters = limiters.clone();

        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard so the UI's JS/CSS assets resolve
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(username_index.clone())
            .service(health)
            .configure(move |cfg| routes::configure(cfg, &routes_config, &routes_limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
