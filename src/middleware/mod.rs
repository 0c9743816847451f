/*
 * Responsibility
 * - middleware の公開インターフェース
 * - correlation (X-Correlation-Id), http (trace/limit/timeout), auth (Bearer)
 */
pub mod auth;
pub mod correlation;
pub mod http;
