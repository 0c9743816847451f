/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - 認証 / 認可 / 下流エラーを統一的に変換
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::{AuthorizationDeniedError, InvalidTokenError};
use crate::services::controller::DownstreamError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    Unauthorized(InvalidTokenError),
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{message}")]
    Downstream { status: StatusCode, message: String },
    #[error("downstream timeout")]
    GatewayTimeout,
    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthorized(reason) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", reason.to_string())
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", "forbidden".into()),
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.to_string())
            }
            AppError::Downstream { status, message } => (*status, "DOWNSTREAM_ERROR", message.clone()),
            AppError::GatewayTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "GATEWAY_TIMEOUT",
                "downstream timeout".into(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: message.clone(),
            },
        };

        let mut res = (status, Json(body)).into_response();

        if let AppError::Unauthorized(_) = self {
            let challenge = format!(
                "Bearer error=\"invalid_token\", error_description=\"{}\"",
                message
            );
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                res.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
        }

        res
    }
}

impl From<InvalidTokenError> for AppError {
    fn from(e: InvalidTokenError) -> Self {
        AppError::Unauthorized(e)
    }
}

impl From<AuthorizationDeniedError> for AppError {
    fn from(_: AuthorizationDeniedError) -> Self {
        AppError::Forbidden
    }
}

impl From<DownstreamError> for AppError {
    fn from(e: DownstreamError) -> Self {
        match e {
            DownstreamError::Status { status, body } => match StatusCode::from_u16(status) {
                Ok(status) => AppError::Downstream {
                    status,
                    message: format!("ControllerApp error: {body}"),
                },
                Err(_) => AppError::Internal,
            },
            DownstreamError::Timeout => AppError::GatewayTimeout,
            DownstreamError::InvalidScanId => AppError::BadRequest("invalid scan id"),

            // Credential / transport / decode failures are not the caller's fault
            other => {
                tracing::error!(error = %other, "ControllerApp call failed");
                AppError::Internal
            }
        }
    }
}
