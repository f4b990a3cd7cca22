//! Request-id propagation.
//!
//! Every request carries an `x-request-id`: an inbound value is preserved, a
//! missing one is generated, and the id is echoed on the response so one
//! request can be correlated across service logs.

use axum::http::HeaderValue;
use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Ensure the request has an id and echo it on the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match HeaderValue::from_str(&request_id) {
        Ok(header_value) => {
            req.headers_mut()
                .insert(REQUEST_ID_HEADER, header_value.clone());

            let mut response = next.run(req).await;
            response
                .headers_mut()
                .insert(REQUEST_ID_HEADER, header_value);
            response
        }
        // An inbound id that cannot round-trip as a header is dropped rather
        // than propagated.
        Err(_) => next.run(req).await,
    }
}
