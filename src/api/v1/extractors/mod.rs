pub mod auth_ctx;
pub mod correlation;

pub use auth_ctx::AuthCtxExtractor;
pub use correlation::CorrelationExtractor;
