use std::sync::Mutex;
use actix_web::{web::Data, App, HttpServer, middleware::Logger};
use anyhow::Context;
use chrono::Duration;
use tracing_subscriber::EnvFilter;

use auth::Auth;
use settings::Settings;
use db::{DB, store::Store};

mod auth;
mod data;
mod db;
mod error;
mod forms;
mod render;
mod routes;
mod settings;

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.telemetry.log_filter.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings);

    let mut db = DB::open(Store::new(settings.store.path.clone()))
        .with_context(|| format!("failed to open store at {}", settings.store.path.display()))?;
    db.grant_superusers(&settings.auth.superusers)
        .with_context(|| "failed to persist superuser permissions")?;

    let auth = Data::new(Mutex::new(Auth::init(Duration::days(settings.auth.session_max_age_days))));
    let db = Data::new(Mutex::new(db));
    let static_dir = settings.server.static_dir.clone();

    tracing::info!(host = %settings.server.host, port = settings.server.port, "starting server");
    HttpServer::new(move || {
        App::new()
            .configure(|cfg| routes::configure(cfg, auth.clone(), db.clone(), static_dir.clone()))
            .wrap(Logger::default())
    })
    .bind((settings.server.host.as_str(), settings.server.port))
    .with_context(|| format!("failed to bind {}:{}", settings.server.host, settings.server.port))?
    .run()
    .await
    .with_context(|| "server terminated unexpectedly")
}
