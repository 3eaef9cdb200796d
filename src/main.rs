mod config;
mod db;
mod error;
mod export;
mod generate;
mod render;
mod routes;
mod state;
mod storage;
mod store;
mod template;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sertifikat=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    crate::storage::ensure_dirs(&config.results_folder)?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(pool.as_ref()).await?;

    let templates: Arc<dyn store::TemplateStore> = Arc::new(db::PgTemplateStore::new(pool.clone()));
    let registrations: Arc<dyn store::RegistrationSource> =
        Arc::new(db::PgRegistrationSource::new(pool.clone()));
    let certificates: Arc<dyn store::CertificateRecords> =
        Arc::new(db::PgCertificateRecords::new(pool.clone()));
    let exporter: Arc<dyn export::DocumentExporter> =
        Arc::new(export::PdfExporter::new(config.results_folder.clone()));

    let coordinator = Arc::new(generate::Coordinator::new(
        templates.clone(),
        registrations,
        certificates.clone(),
        exporter,
        config.bulk_concurrency,
    ));

    let state = state::AppState {
        config: config.clone(),
        coordinator,
        templates,
        certificates,
    };

    let app = Router::new()
        .route("/", get(routes::index))
        .route("/api/template", get(routes::get_template).put(routes::put_template))
        .route("/api/template/normalize", post(routes::normalize_template))
        .route("/api/template/preview", post(routes::preview_template))
        .route(
            "/api/events/:event_id/certificates",
            get(routes::list_certificates).post(routes::generate_bulk),
        )
        .route(
            "/api/events/:event_id/participants/:participant_id/certificate",
            post(routes::generate_one),
        )
        .route(
            "/api/events/:event_id/participants/:participant_id/issue",
            post(routes::mark_issued),
        )
        .route(
            "/download_certificate/:event_id/:participant_id",
            get(routes::download_certificate),
        )
        .route("/download_all/:event_id", get(routes::download_all))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Sertifikat listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
