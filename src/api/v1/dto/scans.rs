/*
 * Responsibility
 * - Scan 系 response DTO
 * - 下流の ScanResponse から呼び出し元に返す形 ({scanId, status, message}) へ変換
 */
use serde::Serialize;

use crate::services::controller::ScanResponse;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponseDto {
    pub scan_id: String,
    pub status: Option<String>,
    pub message: Option<String>,
}

impl ScanResponseDto {
    /// `scanId` falls back to the requested id when ControllerApp omits it.
    pub fn from_downstream(requested_id: &str, res: ScanResponse) -> Self {
        Self {
            scan_id: res.scan_id.unwrap_or_else(|| requested_id.to_string()),
            status: res.status,
            message: res.message,
        }
    }
}
