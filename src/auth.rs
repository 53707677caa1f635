//! Admin session extraction.
//!
//! Admin handlers take an [`AdminSession`] argument; there is no ambient
//! "current user". A session exists only for the request that presented a
//! valid bearer token.

use crate::{errors::AppError, state::AppState};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use subtle::ConstantTimeEq;

/// Proof that the current request carries the configured admin token.
#[derive(Clone, Debug)]
pub struct AdminSession {
    /// Short md5 fingerprint of the presented token, safe to log.
    pub fingerprint: String,
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            tracing::warn!("admin request rejected: no admin token configured");
            return Err(AppError::unauthorized("admin access is not configured"));
        };

        let presented = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        if !secure_compare(presented, expected) {
            tracing::warn!(path = %parts.uri.path(), "admin request rejected: bad token");
            return Err(AppError::unauthorized("invalid bearer token"));
        }

        let digest = format!("{:x}", md5::compute(presented));
        Ok(AdminSession {
            fingerprint: digest[..8].to_string(),
        })
    }
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_tokens() {
        assert!(secure_compare("secret", "secret"));
        assert!(!secure_compare("secret", "secreT"));
        assert!(!secure_compare("secret", "secret2"));
        assert!(!secure_compare("", "secret"));
    }
}
