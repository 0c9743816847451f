//! Admin scan operations with attempt/outcome auditing.
//!
//! Each call runs `PENDING → ATTEMPT_RECORDED → SUCCESS | FAILURE`:
//! - ATTEMPT is written before the downstream call starts
//! - exactly one terminal event follows, carrying the same identity/resource/correlation
//! - downstream errors are returned unchanged after FAILURE is written
//!
//! Role checks happen before this layer (handlers call `require_role`) and are not audited
//! here.
use std::{fmt, future::Future, sync::Arc};
use tracing::warn;

use crate::services::audit::{AuditAction, AuditStatus, AuditTrail};
use crate::services::auth::ValidatedIdentity;
use crate::services::controller::{DownstreamError, ScanController, ScanResponse};
use crate::services::correlation::CorrelationId;

/// Explicit per-request context threaded from the handler into the service layer.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: ValidatedIdentity,
    pub correlation_id: Option<CorrelationId>,
}

impl RequestContext {
    pub fn new(identity: ValidatedIdentity, correlation_id: Option<CorrelationId>) -> Self {
        Self {
            identity,
            correlation_id,
        }
    }
}

#[derive(Clone)]
pub struct AdminService {
    controller: Arc<dyn ScanController>,
    audit: AuditTrail,
}

impl fmt::Debug for AdminService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminService")
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

impl AdminService {
    pub fn new(controller: Arc<dyn ScanController>, audit: AuditTrail) -> Self {
        Self { controller, audit }
    }

    pub async fn force_close_scan(
        &self,
        ctx: &RequestContext,
        scan_id: &str,
    ) -> Result<ScanResponse, DownstreamError> {
        self.gated(
            AuditAction::ForceCloseScan,
            ctx,
            scan_id,
            self.controller.force_close_scan(scan_id),
        )
        .await
    }

    pub async fn get_scan(
        &self,
        ctx: &RequestContext,
        scan_id: &str,
    ) -> Result<ScanResponse, DownstreamError> {
        self.gated(
            AuditAction::GetScan,
            ctx,
            scan_id,
            self.controller.get_scan(scan_id),
        )
        .await
    }

    async fn gated<T, E, F>(
        &self,
        action: AuditAction,
        ctx: &RequestContext,
        resource_id: &str,
        call: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let attempt = Attempt::record(&self.audit, action, ctx, resource_id);

        let outcome = call.await;
        match &outcome {
            Ok(_) => attempt.finish(AuditStatus::Success),
            Err(e) => {
                warn!(action = ?action, resource_id, error = %e, "admin operation failed");
                attempt.finish(AuditStatus::Failure);
            }
        }

        outcome
    }
}

/// An ATTEMPT that has been written and still owes a terminal event.
///
/// Dropping it unfinished (the request future was cancelled) writes FAILURE.
struct Attempt<'a> {
    audit: &'a AuditTrail,
    action: AuditAction,
    ctx: &'a RequestContext,
    resource_id: &'a str,
    finished: bool,
}

impl<'a> Attempt<'a> {
    fn record(
        audit: &'a AuditTrail,
        action: AuditAction,
        ctx: &'a RequestContext,
        resource_id: &'a str,
    ) -> Self {
        let attempt = Self {
            audit,
            action,
            ctx,
            resource_id,
            finished: false,
        };
        attempt.write(AuditStatus::Attempt);
        attempt
    }

    fn finish(mut self, status: AuditStatus) {
        self.finished = true;
        self.write(status);
    }

    fn write(&self, status: AuditStatus) {
        self.audit.record(
            self.action,
            &self.ctx.identity,
            self.resource_id,
            status,
            self.ctx.correlation_id.as_ref(),
        );
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(action = ?self.action, resource_id = self.resource_id, "admin operation cancelled");
            self.write(AuditStatus::Failure);
        }
    }
}
