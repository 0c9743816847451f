//! ControllerApp (downstream scan service) client.
//!
//! The `ScanController` trait is the seam the admin service calls; `HttpControllerClient`
//! is the production implementation authenticated with the cached service token.
pub mod client;
pub mod error;
pub mod model;

pub use client::{HttpControllerClient, ScanController};
pub use error::DownstreamError;
pub use model::{ScanResponse, is_valid_scan_id};
