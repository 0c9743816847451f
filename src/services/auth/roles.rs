//! `roles` claim → authority set.
//!
//! Authorities carry a fixed `ROLE_` prefix internally. Anything presented outside the
//! gate (audit events, handlers) goes through [`domain_roles`] and sees plain names
//! such as `ADMIN`.
use std::collections::BTreeSet;

use crate::services::auth::access_jwt::ValidatedClaims;

pub const ROLE_PREFIX: &str = "ROLE_";

pub fn to_authority(role: &str) -> String {
    format!("{ROLE_PREFIX}{role}")
}

pub fn strip_authority(authority: &str) -> Option<&str> {
    authority.strip_prefix(ROLE_PREFIX)
}

/// Map the `roles` claim to prefixed authorities.
///
/// Absent, empty or non-string claims yield the empty set (never an error).
pub fn map_roles(claims: &ValidatedClaims) -> BTreeSet<String> {
    map_roles_value(&claims.roles)
}

pub fn map_roles_value(roles: &serde_json::Value) -> BTreeSet<String> {
    match roles {
        serde_json::Value::Array(values) => values
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|r| !r.trim().is_empty())
            .map(to_authority)
            .collect(),
        serde_json::Value::String(role) if !role.trim().is_empty() => {
            BTreeSet::from([to_authority(role)])
        }
        _ => BTreeSet::new(),
    }
}

/// Unprefixed role names, sorted.
pub fn domain_roles(authorities: &BTreeSet<String>) -> Vec<String> {
    authorities
        .iter()
        .filter_map(|a| strip_authority(a))
        .map(str::to_string)
        .collect()
}
