use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{error::ApiError, main_lib::AppState};

/// Extractor guarding admin routes.
///
/// Succeeds only when `Authorization: Bearer <token>` matches the configured
/// admin token. With no token configured every admin request is refused.
pub struct RequireAdmin;

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Err(ApiError::Unauthorized(
                "Admin access is not configured".to_string(),
            ));
        };

        let provided = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);

        match provided {
            Some(token) if tokens_match(token, expected) => Ok(RequireAdmin),
            Some(_) => Err(ApiError::Unauthorized("Invalid admin token".to_string())),
            None => Err(ApiError::Unauthorized("Admin token required".to_string())),
        }
    }
}

/// Comparison time does not depend on where the first mismatch is.
fn tokens_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
