use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ForceCloseScan,
    GetScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    Attempt,
    Success,
    Failure,
}

/// One audit record. Immutable once built; absent optional fields are not serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_id: Option<String>,
    timestamp: DateTime<Utc>,
    status: AuditStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl AuditEvent {
    pub fn builder(action: AuditAction, status: AuditStatus) -> AuditEventBuilder {
        AuditEventBuilder {
            action,
            status,
            subject: None,
            user_id: None,
            roles: Vec::new(),
            resource_id: None,
            timestamp: None,
            correlation_id: None,
        }
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn status(&self) -> AuditStatus {
        self.status
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct AuditEventBuilder {
    action: AuditAction,
    status: AuditStatus,
    subject: Option<String>,
    user_id: Option<String>,
    roles: Vec<String>,
    resource_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    correlation_id: Option<String>,
}

impl AuditEventBuilder {
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Timestamp defaults to construction time.
    pub fn build(self) -> AuditEvent {
        AuditEvent {
            action: self.action,
            subject: self.subject,
            user_id: self.user_id,
            roles: self.roles,
            resource_id: self.resource_id,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            status: self.status,
            correlation_id: self.correlation_id,
        }
    }
}
