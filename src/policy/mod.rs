use serde::Deserialize;
use tracing::warn;

use crate::identity::Identity;

/// Pattern matching every path.
pub const ANY_RESOURCE_PATTERN: &str = "/*";

/// Protection level applied to a matched resource.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Authentication and authorization both apply.
    All,
    Authentication,
    Authorization,
    NotProtected,
}

/// A configured protection rule: path pattern, constraint level and the roles
/// allowed through. Immutable once constructed.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ProtectedResource {
    pub pattern: String,
    #[serde(default = "ProtectedResource::default_constraint")]
    pub constraint: Constraint,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl ProtectedResource {
    pub fn new(pattern: impl Into<String>, constraint: Constraint) -> Self {
        ProtectedResource {
            pattern: pattern.into(),
            constraint,
            roles: Vec::new(),
        }
    }

    pub fn with_roles<I, S>(pattern: impl Into<String>, constraint: Constraint, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProtectedResource {
            pattern: pattern.into(),
            constraint,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    fn default_constraint() -> Constraint {
        Constraint::All
    }

    /// Whether the pattern covers `path`: `/*` covers everything, a plain
    /// pattern only its exact path, and a trailing `/*` any path under the
    /// prefix in front of it.
    pub fn matches(&self, path: &str) -> bool {
        if self.pattern == ANY_RESOURCE_PATTERN {
            return true;
        }

        if self.pattern == path {
            return true;
        }

        if self.pattern.ends_with(ANY_RESOURCE_PATTERN) {
            // keep the slash so that "/secure/*" does not cover "/secureX"
            let prefix = &self.pattern[..self.pattern.len() - 1];
            return path.starts_with(prefix);
        }

        false
    }

    pub fn requires_authentication(&self) -> bool {
        self.constraint != Constraint::NotProtected
    }

    pub fn requires_authorization(&self) -> bool {
        matches!(self.constraint, Constraint::All | Constraint::Authorization)
    }

    /// Role check: with no configured roles any authenticated identity passes;
    /// otherwise holding any one of the listed roles suffices.
    pub fn is_allowed(&self, identity: &Identity) -> bool {
        if self.roles.is_empty() {
            return true;
        }

        self.roles.iter().any(|role| identity.has_role(role))
    }
}

/// Ordered protection rules plus the built-in catch-all fallback.
///
/// Populated at configuration time, read-only afterwards.
pub struct ResourcePolicy {
    resources: Vec<ProtectedResource>,
    default_resource: ProtectedResource,
}

impl ResourcePolicy {
    pub fn new(resources: Vec<ProtectedResource>) -> Self {
        if resources.is_empty() {
            warn!("No protected resource rules configured, every path requires authentication");
        }

        ResourcePolicy {
            resources,
            default_resource: ProtectedResource::new(ANY_RESOURCE_PATTERN, Constraint::All),
        }
    }

    /// First rule matching `path`, in insertion order; unmatched paths fall
    /// back to the fully protected `/*` rule.
    pub fn classify(&self, path: &str) -> &ProtectedResource {
        self.resources
            .iter()
            .find(|resource| resource.matches(path))
            .unwrap_or(&self.default_resource)
    }
}
