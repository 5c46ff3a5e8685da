use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod model;
mod models;
mod repository;
mod routes;
mod service;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::repository::mysql::MySqlStore;
use crate::service::clock::{Clock, SystemClock};
use crate::service::geo::{FixPolicy, GeoValidator};
use crate::service::justification::JustificationWorkflow;
use crate::service::punctuality::PunctualityCalculator;
use crate::service::registrar::AttendanceRegistrar;
use crate::service::schedule::ScheduleResolver;
use crate::utils::zone_cache::CachedZoneRepository;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    let store = Arc::new(MySqlStore::new(pool));

    let zones = Arc::new(CachedZoneRepository::new(
        store.clone(),
        std::time::Duration::from_secs(config.zone_cache_ttl_secs),
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let registrar = Data::new(AttendanceRegistrar::new(
        GeoValidator::new(zones),
        ScheduleResolver::new(store.clone()),
        PunctualityCalculator::new(config.late_tolerance_minutes),
        FixPolicy {
            max_accuracy_meters: config.gps_max_accuracy_meters,
            max_age: Duration::seconds(config.gps_max_fix_age_secs),
        },
        store.clone(),
        config.utc_offset()?,
    ));
    let workflow = Data::new(JustificationWorkflow::new(
        store.clone(),
        store,
        clock.clone(),
        config.justification_max_days,
    ));
    let clock = Data::from(clock);

    info!(
        tolerance_minutes = config.late_tolerance_minutes,
        utc_offset_minutes = config.utc_offset_minutes,
        "Attendance rules loaded"
    );

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(registrar.clone())
            .app_data(workflow.clone())
            .app_data(clock.clone())
            // Auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
