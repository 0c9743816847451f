//! Correlation id middleware (outermost layer).
//!
//! Responsibility:
//! - `X-Correlation-Id` を採用 or 生成し、request extensions に載せる
//! - リクエスト全体を `request{correlation_id=..}` span の中で実行する
//! - 成功・エラーを問わず、全レスポンスに `X-Correlation-Id` を返す
//!
//! The binding lives in a `CorrelationScope` owned by this request's future, so it is
//! cleared on every exit path and cannot reach the next request on the same worker.
use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
};
use tracing::Instrument;

use crate::services::correlation::{CORRELATION_ID_HEADER, CorrelationContext};

pub fn apply(router: Router) -> Router {
    router.layer(middleware::from_fn(correlation_middleware))
}

async fn correlation_middleware(mut req: Request<Body>, next: Next) -> Response {
    let mut context = CorrelationContext::new();
    let inbound = req
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let scope = context.begin(inbound.as_deref());
    let id = scope.id().clone();

    req.extensions_mut().insert(id.clone());

    let span = tracing::info_span!("request", correlation_id = %id);
    let mut res = next.run(req).instrument(span).await;

    match HeaderValue::from_str(id.as_str()) {
        Ok(value) => {
            res.headers_mut()
                .insert(HeaderName::from_static(CORRELATION_ID_HEADER), value);
        }
        Err(_) => tracing::warn!("correlation id is not a valid header value"),
    }

    drop(scope);
    res
}
