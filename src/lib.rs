//! Admin gateway: bearer-token validation, ADMIN role gating, correlation ids and an
//! attempt/success/failure audit trail around calls to ControllerApp.
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
