//! Shared-secret API key authentication
//!
//! Requests carry the key in the `X-API-KEY` header; it must equal the
//! configured key exactly.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use tracing::warn;

use crate::error::CastError;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Expected API key
#[derive(Clone)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Arc::from(key.into()))
    }

    /// Check a presented key for exact equality
    pub fn matches(&self, presented: Option<&str>) -> bool {
        presented == Some(&*self.0)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Extractor that rejects requests without the right API key
///
/// Place it before any body extractor so a bad key is refused before the
/// body is read.
#[derive(Debug, Clone, Copy)]
pub struct RequireApiKey;

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequireApiKey
where
    ApiKey: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = CastError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let expected = ApiKey::from_ref(state);
        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if expected.matches(presented) {
            Ok(RequireApiKey)
        } else {
            warn!(
                "Rejected request to {} with {} API key",
                parts.uri.path(),
                if presented.is_some() { "invalid" } else { "missing" }
            );
            Err(CastError::InvalidApiKey)
        }
    }
}
