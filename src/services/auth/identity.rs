use std::collections::BTreeSet;

use crate::services::auth::{access_jwt::ValidatedClaims, roles};

/// 検証済みトークンから 1 リクエストにつき 1 回だけ作られる主体情報
///
/// - `subject` は `sub` (不変のユーザー ID)
/// - `display_name` は `preferred_username`、無ければ `subject`
/// - `authorities` は `ROLE_` 付きの内部表現。外に見せる時は `roles()` を使う
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIdentity {
    subject: String,
    display_name: String,
    authorities: BTreeSet<String>,
}

impl ValidatedIdentity {
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        authorities: BTreeSet<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            authorities,
        }
    }

    pub fn from_claims(claims: &ValidatedClaims) -> Self {
        let display_name = claims
            .preferred_username
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&claims.sub);

        Self::new(claims.sub.clone(), display_name, roles::map_roles(claims))
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }

    pub fn roles(&self) -> Vec<String> {
        roles::domain_roles(&self.authorities)
    }
}
