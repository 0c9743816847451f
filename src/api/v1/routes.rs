/*
 * Responsibility
 * - URL 構造を定義
 * - /health は公開、/admin/... は Bearer 必須 (app.rs で access middleware を適用)
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use crate::api::v1::handlers::{
    health::health,
    scans::{force_close_scan, get_scan},
};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/scan/{scan_id}/force-close", post(force_close_scan))
        .route("/admin/scan/{scan_id}", get(get_scan))
}
