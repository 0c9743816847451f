use serde::Serialize;
use std::{fmt, sync::Arc};
use tracing::error;

use crate::services::audit::{
    event::{AuditAction, AuditEvent, AuditStatus},
    sink::{AUDIT_TARGET, AuditSink, AuditSinkError},
};
use crate::services::auth::ValidatedIdentity;
use crate::services::correlation::CorrelationId;

/// Writes audit events to the audit sink.
///
/// Never fails towards the caller: a record that cannot be serialized is written in
/// Debug form instead, and sink errors are logged.
#[derive(Clone)]
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
}

impl fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditTrail").finish_non_exhaustive()
    }
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn record(
        &self,
        action: AuditAction,
        identity: &ValidatedIdentity,
        resource_id: &str,
        status: AuditStatus,
        correlation_id: Option<&CorrelationId>,
    ) {
        let event = AuditEvent::builder(action, status)
            .subject(identity.display_name())
            .user_id(identity.subject())
            .roles(identity.roles())
            .resource_id(resource_id)
            .correlation_id(correlation_id.map(CorrelationId::to_string))
            .build();

        self.emit(&event);
    }

    fn emit<E: Serialize + fmt::Debug>(&self, event: &E) {
        let record = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                let err = AuditSinkError::from(e);
                error!(target: AUDIT_TARGET, error = %err, "failed to serialize audit event");
                format!("{event:?}")
            }
        };

        if let Err(err) = self.sink.write_record(&record) {
            // Last resort: the record still reaches the application log.
            error!(target: AUDIT_TARGET, error = %err, raw = %record, "failed to write audit event");
        }
    }
}
