pub mod config;
pub mod handlers;
pub mod models;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{ExpenseStore, MondayClient, MongoExpenseStore, SyncEngine};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ExpenseStore>,
    pub monday: MondayClient,
    pub sync_engine: SyncEngine,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route("/sync", post(handlers::sync::sync))
        .route("/boards/verify", get(handlers::sync::verify_board))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                // company_id/user_id start empty and are recorded by the
                // CompanyContext extractor once the headers are read.
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    company_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

pub struct Application {
    port: u16,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some("expense-service".to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let store = MongoExpenseStore::new(&db);
        store.init_indexes().await?;
        let store: Arc<dyn ExpenseStore> = Arc::new(store);

        let monday = MondayClient::new(config.monday.clone())?;
        if monday.is_configured() {
            tracing::info!("Monday board client initialized");
        } else {
            tracing::warn!("Monday API token not configured - sync features will be limited");
        }

        let sync_engine = SyncEngine::new(monday.clone(), store.clone());

        let state = AppState {
            config: config.clone(),
            store,
            monday,
            sync_engine,
        };

        Ok(Self {
            port: config.server.port,
            router: app_router(state),
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        tracing::info!("Listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
