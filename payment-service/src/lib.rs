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
use services::{FirstDataClient, MongoTransactionStore, TransactionStore, WebhookDispatcher};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn TransactionStore>,
    pub gateway: FirstDataClient,
    pub dispatcher: WebhookDispatcher,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route("/payments", post(handlers::payments::create_payment))
        .route(
            "/payments/:id",
            get(handlers::payments::get_payment).post(handlers::payments::payment_action),
        )
        .route(
            "/webhooks/firstdata",
            post(handlers::webhooks::firstdata_webhook),
        )
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
        client_options.app_name = Some("payment-service".to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let store = MongoTransactionStore::new(&db);
        store.init_indexes().await?;
        let store: Arc<dyn TransactionStore> = Arc::new(store);

        let gateway = FirstDataClient::new(config.firstdata.clone())?;
        if gateway.is_configured() {
            tracing::info!("First Data gateway client initialized");
        } else {
            tracing::warn!("First Data credentials not configured - payments will be rejected");
        }

        let dispatcher = WebhookDispatcher::new(store.clone());

        let state = AppState {
            config: config.clone(),
            store,
            gateway,
            dispatcher,
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
