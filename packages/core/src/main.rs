use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, middleware, routing::get, Router};
use clap::Parser;
use dotenvy::dotenv;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use medtracker::api;
use medtracker::cache::KeyedTtlCache;
use medtracker::cli::Cli;
use medtracker::config::Config;
use medtracker::db;
use medtracker::logging::init_logging;
use medtracker::metrics::{self, AppMetrics};
use medtracker::repository::MedicationRepository;
use medtracker::services::openfda::{DrugInfoProvider, OpenFdaClient};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env()
        .map(|config| config.apply_cli(&cli))
        .unwrap_or_else(|err| {
            tracing::error!("Config error: {}", err);
            std::process::exit(1);
        });

    tracing::info!("Service starting with config: {:?}", config);

    let pool = db::create_pool(&config.database_url)
        .await
        .unwrap_or_else(|err| {
            tracing::error!("Failed to open database: {}", err);
            std::process::exit(1);
        });

    let repo = Arc::new(MedicationRepository::new(pool));
    let openfda = Arc::new(OpenFdaClient::new(config.openfda_base_url.clone()));
    let drug_info: Arc<dyn DrugInfoProvider + Send + Sync> = openfda;
    let drug_info_cache = Arc::new(Mutex::new(KeyedTtlCache::new(Duration::from_secs(
        config.drug_info_cache_ttl_seconds,
    ))));
    let app_metrics = Arc::new(AppMetrics::new().unwrap_or_else(|err| {
        tracing::error!("Failed to register metrics: {}", err);
        std::process::exit(1);
    }));

    let medications_state = Arc::new(api::medications::MedicationsApiState {
        repo: repo.clone(),
        drug_info,
        drug_info_cache,
        metrics: app_metrics.clone(),
    });

    let metrics_for_handler = app_metrics.clone();
    let app = Router::new()
        .route("/health", get(api::health::health))
        .route(
            "/metrics",
            get(move || {
                let m = metrics_for_handler.clone();
                async move {
                    match m.render() {
                        Ok(body) => axum::response::Response::builder()
                            .status(200)
                            .header(
                                axum::http::header::CONTENT_TYPE,
                                "text/plain; version=0.0.4",
                            )
                            .body(Body::from(body))
                            .unwrap(),
                        Err(_) => axum::response::Response::builder()
                            .status(500)
                            .body(Body::from("metrics error"))
                            .unwrap(),
                    }
                }
            }),
        )
        .merge(api::medications::create_medications_router(medications_state))
        .merge(api::dose_logs::create_dose_logs_router(repo.clone()))
        .merge(api::notes::create_notes_router(repo))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(
            app_metrics,
            metrics::track_http,
        ));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|err| {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, err);
            std::process::exit(1);
        });

    tracing::info!("Listening on {}", config.bind_addr);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", err);
        std::process::exit(1);
    }
}
