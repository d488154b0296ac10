use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::constants::CALLER_ID_HEADER;
use crate::error::AppError;

/// Id of the authenticated caller.
///
/// Authentication happens upstream; the gateway forwards the resolved user id
/// in the `X-User-Id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_ID_HEADER)
            .ok_or(AppError::Unauthorized)?;

        raw.to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(Caller)
            .ok_or_else(|| {
                tracing::warn!("Rejected malformed {} header", CALLER_ID_HEADER);
                AppError::Unauthorized
            })
    }
}
