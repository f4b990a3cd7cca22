use anyhow::Result;
use dotenvy::dotenv;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub firstdata: FirstDataConfig,
    pub webhook: WebhookConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

/// First Data (Fiserv) gateway credentials.
#[derive(Deserialize, Clone, Debug)]
pub struct FirstDataConfig {
    pub merchant_id: String,
    pub api_key: Secret<String>,
    pub api_secret: Secret<String>,
    pub api_base_url: String,
    /// Per-request timeout for gateway calls, in seconds.
    pub request_timeout_seconds: u64,
}

impl FirstDataConfig {
    /// Whether the gateway credentials are present. Callers short-circuit on
    /// this before building a request.
    pub fn is_configured(&self) -> bool {
        !self.merchant_id.is_empty()
            && !self.api_key.expose_secret().is_empty()
            && !self.api_secret.expose_secret().is_empty()
    }
}

/// Webhook endpoint configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct WebhookConfig {
    pub secret: Secret<String>,
    /// Development-only escape hatch: accept deliveries without a signature
    /// header. A missing secret still rejects.
    pub allow_unsigned: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("PAYMENT_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PAYMENT_SERVICE_PORT")
            .unwrap_or_else(|_| "3003".to_string())
            .parse()?;

        let db_url = env::var("PAYMENT_DATABASE_URL").expect("PAYMENT_DATABASE_URL must be set");
        let db_name =
            env::var("PAYMENT_DATABASE_NAME").unwrap_or_else(|_| "payment_db".to_string());

        let merchant_id = env::var("FIRSTDATA_MERCHANT_ID").unwrap_or_default();
        let api_key = env::var("FIRSTDATA_API_KEY").unwrap_or_default();
        let api_secret = env::var("FIRSTDATA_API_SECRET").unwrap_or_default();
        let api_base_url = env::var("FIRSTDATA_API_BASE_URL")
            .unwrap_or_else(|_| "https://api-cert.payeezy.com".to_string());
        let request_timeout_seconds = env::var("FIRSTDATA_REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let webhook_secret = env::var("FIRSTDATA_WEBHOOK_SECRET").unwrap_or_default();
        let allow_unsigned = env::var("FIRSTDATA_ALLOW_UNSIGNED_WEBHOOKS")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            firstdata: FirstDataConfig {
                merchant_id,
                api_key: Secret::new(api_key),
                api_secret: Secret::new(api_secret),
                api_base_url,
                request_timeout_seconds,
            },
            webhook: WebhookConfig {
                secret: Secret::new(webhook_secret),
                allow_unsigned,
            },
            service_name: "payment-service".to_string(),
        })
    }
}
