//! Company context extractor.
//!
//! Extracts the company scope (company_id, user_id) from request headers.
//! The headers are set by the authenticating frontend after it has resolved
//! the caller's session, so the services themselves never see credentials.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

/// Company scope extracted from request headers.
#[derive(Debug, Clone)]
pub struct CompanyContext {
    /// Company the request operates on.
    pub company_id: String,
    /// User making the request (optional for scheduled jobs).
    pub user_id: Option<String>,
}

impl CompanyContext {
    pub fn new(company_id: String, user_id: Option<String>) -> Self {
        Self {
            company_id,
            user_id,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CompanyContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let company_id = parts
            .headers
            .get("X-Company-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing X-Company-ID header"))
            })?;

        let user_id = parts
            .headers
            .get("X-User-ID")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let span = tracing::Span::current();
        span.record("company_id", company_id);
        if let Some(ref uid) = user_id {
            span.record("user_id", uid.as_str());
        }

        Ok(CompanyContext::new(company_id.to_string(), user_id))
    }
}
