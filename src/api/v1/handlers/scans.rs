/*
 * Responsibility
 * - /admin/scan 系 handler
 * - ADMIN ロールをここで確認 (メソッドレベルの認可)
 * - AuthCtx と correlation id を RequestContext にまとめて service に渡す
 */
use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    api::v1::{
        dto::scans::ScanResponseDto,
        extractors::{AuthCtxExtractor, CorrelationExtractor},
    },
    error::AppError,
    services::{
        admin::RequestContext,
        auth::{Role, ValidatedIdentity, require_role},
        controller::is_valid_scan_id,
    },
    state::AppState,
};

fn authorize_admin(identity: &ValidatedIdentity) -> Result<(), AppError> {
    require_role(identity, Role::Admin).map_err(|err| {
        tracing::warn!(subject = identity.subject(), reason = %err.reason, "role check failed");
        AppError::from(err)
    })
}

// Checked before the gated call so nothing is audited or sent downstream.
fn ensure_scan_id(scan_id: &str) -> Result<(), AppError> {
    if is_valid_scan_id(scan_id) {
        Ok(())
    } else {
        Err(AppError::BadRequest("invalid scan id"))
    }
}

pub async fn force_close_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
    AuthCtxExtractor(identity): AuthCtxExtractor,
    CorrelationExtractor(correlation_id): CorrelationExtractor,
) -> Result<Json<ScanResponseDto>, AppError> {
    authorize_admin(&identity)?;
    ensure_scan_id(&scan_id)?;

    let ctx = RequestContext::new(identity, correlation_id);
    let res = state.admin.force_close_scan(&ctx, &scan_id).await?;

    Ok(Json(ScanResponseDto::from_downstream(&scan_id, res)))
}

pub async fn get_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
    AuthCtxExtractor(identity): AuthCtxExtractor,
    CorrelationExtractor(correlation_id): CorrelationExtractor,
) -> Result<Json<ScanResponseDto>, AppError> {
    authorize_admin(&identity)?;
    ensure_scan_id(&scan_id)?;

    let ctx = RequestContext::new(identity, correlation_id);
    let res = state.admin.get_scan(&ctx, &scan_id).await?;

    Ok(Json(ScanResponseDto::from_downstream(&scan_id, res)))
}
