//! Method-level role gate.
//!
//! Independent of the route-level "authenticated" middleware: a caller that got past
//! token validation with no roles is still denied here.
use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::services::auth::{identity::ValidatedIdentity, roles};

/// The fixed role model. Gated scan operations require `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Support,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Support => "SUPPORT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub reason: String,
}

impl AuthorizationDecision {
    fn allow(role: &str) -> Self {
        Self {
            allowed: true,
            reason: format!("role {role} granted"),
        }
    }

    fn deny(reason: String) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("access denied: {reason}")]
pub struct AuthorizationDeniedError {
    pub required: &'static str,
    pub reason: String,
}

/// Deny by default; allow only on exact membership of the normalized role.
///
/// `required` may be given as a plain role (`ADMIN`) or an authority (`ROLE_ADMIN`).
pub fn authorize(required: &str, authorities: &BTreeSet<String>) -> AuthorizationDecision {
    let role = roles::strip_authority(required).unwrap_or(required);
    if role.trim().is_empty() {
        return AuthorizationDecision::deny("no role requested".to_string());
    }
    if authorities.is_empty() {
        return AuthorizationDecision::deny(format!("caller has no roles, {role} required"));
    }
    if authorities.contains(&roles::to_authority(role)) {
        AuthorizationDecision::allow(role)
    } else {
        AuthorizationDecision::deny(format!("missing required role {role}"))
    }
}

pub fn require_role(
    identity: &ValidatedIdentity,
    role: Role,
) -> Result<(), AuthorizationDeniedError> {
    let decision = authorize(role.as_str(), identity.authorities());
    if decision.allowed {
        Ok(())
    } else {
        Err(AuthorizationDeniedError {
            required: role.as_str(),
            reason: decision.reason,
        })
    }
}
