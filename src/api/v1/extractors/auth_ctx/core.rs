use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::{InvalidTokenError, ValidatedIdentity};
use crate::state::AppState;

/// Handler で、 ValidatedIdentity を受け取るための extractor
/// access middleware が request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（ミドルウェア未設定）
pub struct AuthCtxExtractor(pub ValidatedIdentity);

impl FromRequestParts<AppState> for AuthCtxExtractor
where
    AppState: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ValidatedIdentity>()
            .cloned()
            .map(AuthCtxExtractor)
            .ok_or(AppError::Unauthorized(InvalidTokenError::MissingBearer))
    }
}
