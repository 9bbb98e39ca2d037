// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Static bearer-token role-based access control.
//!
//! There are no user accounts and no token issuance: operators place
//! tokens into the `auth.admin_tokens` / `auth.operator_tokens` /
//! `auth.viewer_tokens` config sections (or their `MESH_AUTH__*_TOKENS`
//! env equivalents), and a request's `Authorization: Bearer <token>`
//! header is looked up against those sets.

use serde::{Deserialize, Serialize};

use crate::config::AuthSettings;

/// A request's authenticated role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access to query endpoints.
    Viewer,
    /// Viewer permissions plus retry/requeue operations.
    Operator,
    /// Operator permissions plus submit/cancel/republish.
    Admin,
}

/// Resolves bearer tokens to roles against the configured allowlists.
#[derive(Debug, Clone)]
pub struct AuthService {
    settings: AuthSettings,
}

impl AuthService {
    /// Builds a service over the given token allowlists.
    pub fn new(settings: AuthSettings) -> Self {
        Self { settings }
    }

    /// Resolves a bearer token to the highest role it is listed under.
    /// A token present in multiple lists resolves to the most
    /// privileged match.
    pub fn resolve(&self, token: &str) -> Option<Role> {
        if self.settings.admin_tokens.contains(token) {
            Some(Role::Admin)
        } else if self.settings.operator_tokens.contains(token) {
            Some(Role::Operator)
        } else if self.settings.viewer_tokens.contains(token) {
            Some(Role::Viewer)
        } else {
            None
        }
    }

    /// Whether `role` satisfies a `required` role, using the total
    /// order Admin > Operator > Viewer.
    pub fn satisfies(role: Role, required: Role) -> bool {
        role >= required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn settings() -> AuthSettings {
        AuthSettings {
            admin_tokens: HashSet::from(["admin-tok".to_string()]),
            operator_tokens: HashSet::from(["op-tok".to_string()]),
            viewer_tokens: HashSet::from(["view-tok".to_string()]),
        }
    }

    #[test]
    fn test_resolve_known_tokens() {
        let auth = AuthService::new(settings());
        assert_eq!(auth.resolve("admin-tok"), Some(Role::Admin));
        assert_eq!(auth.resolve("op-tok"), Some(Role::Operator));
        assert_eq!(auth.resolve("view-tok"), Some(Role::Viewer));
    }

    #[test]
    fn test_resolve_unknown_token() {
        let auth = AuthService::new(settings());
        assert_eq!(auth.resolve("bogus"), None);
    }

    #[test]
    fn test_admin_satisfies_every_requirement() {
        assert!(AuthService::satisfies(Role::Admin, Role::Viewer));
        assert!(AuthService::satisfies(Role::Admin, Role::Operator));
        assert!(AuthService::satisfies(Role::Admin, Role::Admin));
    }

    #[test]
    fn test_viewer_does_not_satisfy_operator() {
        assert!(!AuthService::satisfies(Role::Viewer, Role::Operator));
    }
}
