/*
 * Responsibility
 * - ドメインロジック層 (HTTP/axum に依存しない)
 * - auth: トークン検証・ロール変換・認可・サービス間トークン
 * - audit: 監査イベントと出力先
 * - controller: 下流 ControllerApp クライアント
 * - admin: 監査付きの管理操作
 */
pub mod admin;
pub mod audit;
pub mod auth;
pub mod controller;
pub mod correlation;
