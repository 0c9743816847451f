/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: トークン検証、admin: 監査付き管理操作
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::{admin::AdminService, auth::TokenValidator};

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: Arc<TokenValidator>,
    pub admin: Arc<AdminService>,
}

impl AppState {
    pub fn new(auth: Arc<TokenValidator>, admin: Arc<AdminService>) -> Self {
        Self { auth, admin }
    }
}
