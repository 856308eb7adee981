//! Device-key authentication middleware.
//!
//! Every protected route requires the shared secret in the X-Device-Key
//! header. Keys are compared in constant time.

use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use facet_core::AppError;
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub const DEVICE_KEY_HEADER: &str = "x-device-key";

#[derive(Clone)]
pub struct AuthState {
    pub device_api_key: String,
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(DEVICE_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    match provided {
        Some(key) if secure_compare(key, &auth_state.device_api_key) => next.run(request).await,
        Some(_) => {
            tracing::debug!(path = %request.uri().path(), "Rejected request with invalid device key");
            HttpAppError(AppError::Unauthorized("Invalid device key".to_string())).into_response()
        }
        None => HttpAppError(AppError::Unauthorized(
            "Missing X-Device-Key header".to_string(),
        ))
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_compare() {
        assert!(secure_compare("secret", "secret"));
        assert!(!secure_compare("secret", "secreT"));
        assert!(!secure_compare("secret", "secret2"));
        assert!(!secure_compare("", "secret"));
    }
}
