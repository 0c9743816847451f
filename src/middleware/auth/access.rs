//! Bearer token 検証 → ValidatedIdentity を extensions に入れる
//!
//! - `/admin/...` の「認証済みであること」を保証する粗いレイヤー
//! - ロールの確認は handler 側 (`require_role`) で別途行う (二重の防御)

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::{InvalidTokenError, ValidatedIdentity};
use crate::state::AppState;

/// 認証が必要なルートに middleware を適用する。
///
/// 例：
/// ```ignore
/// let admin = api::v1::admin_routes();
/// let admin = middleware::auth::access::apply(admin, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // route_layer: マッチしないパスは 404 のまま (認証を要求しない)
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // await を跨ぐので request からの借用を残さない
    let token = bearer_token(req.headers())
        .ok_or(InvalidTokenError::MissingBearer)?
        .to_string();

    // 署名 + iss/exp/aud の検証は TokenValidator 側で実施 (JWKS 取得を含む)
    let claims = match state.auth.validate(&token).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(reason = %err, "access token verification failed");
            return Err(AppError::Unauthorized(err));
        }
    };

    let identity = ValidatedIdentity::from_claims(&claims);
    tracing::debug!(subject = identity.subject(), "access token verified");

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
