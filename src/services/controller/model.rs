use serde::{Deserialize, Serialize};

/// Scan payload returned by ControllerApp.
///
/// Unknown fields are ignored so ControllerApp can add fields freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    #[serde(default)]
    pub scan_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ScanResponse {
    pub fn new(
        scan_id: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            scan_id: Some(scan_id.into()),
            status: Some(status.into()),
            message: Some(message.into()),
        }
    }
}

/// Whether `scan_id` survives as exactly one URL path segment.
///
/// `.` and `..` are dot-segments that URL normalization drops or resolves, so they would
/// address a different ControllerApp resource.
pub fn is_valid_scan_id(scan_id: &str) -> bool {
    !scan_id.trim().is_empty() && scan_id != "." && scan_id != ".."
}
