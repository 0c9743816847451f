pub mod event;
pub mod sink;
pub mod trail;

pub use event::{AuditAction, AuditEvent, AuditStatus};
pub use sink::{AuditSink, AuditSinkError, FileAuditSink, InMemoryAuditSink, TracingAuditSink};
pub use trail::AuditTrail;
