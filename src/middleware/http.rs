//! HTTP-level layers: request tracing, body size limit and the whole-request timeout.
//!
//! Correlation ids are handled by `middleware::correlation`, applied outside these layers,
//! so a timed-out request still carries its id.
//!
//! The request timeout should stay above the ControllerApp call timeout. If it fires
//! mid-operation the admin service still records FAILURE for the dropped call.

use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use tower::timeout::{TimeoutLayer, error::Elapsed};
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;

/// Admin endpoints take no request body worth more than this.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn apply(router: Router, request_timeout: Duration) -> Router {
    let layers = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<Elapsed>() {
                tracing::warn!("request timed out");
                AppError::GatewayTimeout
            } else {
                tracing::error!(error = %err, "unhandled middleware error");
                AppError::Internal
            }
        }))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http());

    router.layer(layers)
}
