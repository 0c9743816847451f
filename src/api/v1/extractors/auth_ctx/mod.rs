/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - 認証済みリクエストの主体 (ValidatedIdentity) を handler に提供する
 * - HTTP / axum 依存は core に閉じ込め、型定義は services::auth 側に置く
 *
 * Public API:
 * - AuthCtxExtractor
 */

mod core;

pub use self::core::AuthCtxExtractor;
