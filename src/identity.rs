use std::collections::HashSet;

/// An authenticated principal and the roles granted to it.
///
/// Produced by the identity backend on successful credential validation and
/// bound to at most one session at a time. The role set is fixed at creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    username: String,
    roles: HashSet<String>,
}

impl Identity {
    pub fn new<I, S>(username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Identity {
            username: username.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn roles(&self) -> &HashSet<String> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
