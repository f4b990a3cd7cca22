use anyhow::Result;
use dotenvy::dotenv;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub monday: MondayConfig,
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

#[derive(Deserialize, Clone, Debug)]
pub struct MondayConfig {
    /// API token for the Monday.com GraphQL API.
    pub api_token: Secret<String>,
    pub api_base_url: String,
    /// Per-request timeout for board API calls, in seconds.
    pub request_timeout_seconds: u64,
}

impl MondayConfig {
    /// Whether the board API credentials are present.
    ///
    /// Callers use this to distinguish "not configured" (actionable setup
    /// problem) from "configured but failing" (operational error).
    pub fn is_configured(&self) -> bool {
        !self.api_token.expose_secret().is_empty()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("EXPENSE_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("EXPENSE_SERVICE_PORT")
            .unwrap_or_else(|_| "3005".to_string())
            .parse()?;

        let db_url = env::var("EXPENSE_DATABASE_URL").expect("EXPENSE_DATABASE_URL must be set");
        let db_name =
            env::var("EXPENSE_DATABASE_NAME").unwrap_or_else(|_| "expense_db".to_string());

        let api_token = env::var("MONDAY_API_TOKEN").unwrap_or_default();
        let api_base_url = env::var("MONDAY_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.monday.com/v2".to_string());
        let request_timeout_seconds = env::var("MONDAY_REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            monday: MondayConfig {
                api_token: Secret::new(api_token),
                api_base_url,
                request_timeout_seconds,
            },
            service_name: "expense-service".to_string(),
        })
    }
}
