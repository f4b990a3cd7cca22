//! Success envelope shared by all caller-facing endpoints.
//!
//! Every successful response carries `{"success": true, "data": ...}` so that
//! clients can branch on one field regardless of endpoint.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
