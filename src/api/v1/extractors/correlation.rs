use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::services::correlation::CorrelationId;

/// correlation middleware が載せた id を取り出す。無ければ `None` (拒否はしない)
pub struct CorrelationExtractor(pub Option<CorrelationId>);

impl<S> FromRequestParts<S> for CorrelationExtractor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<CorrelationId>().cloned()))
    }
}
