pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Error;
use crate::identity::Identity;
use crate::request::SavedRequest;

/// Attribute key the authenticated identity is bound under.
pub const IDENTITY_ATTRIBUTE: &str = "gatewarden.identity";

/// Attribute key an archived saved request is kept under.
pub const SAVED_REQUEST_ATTRIBUTE: &str = "gatewarden.saved-request";

/// Value stored as a session attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionValue {
    Identity(Identity),
    SavedRequest(SavedRequest),
}

/// Session storage consumed by the authentication core.
///
/// The adapter establishes a session (typically from a cookie) through
/// `get_or_create` and threads the resulting id into the [`crate::AuthContext`].
/// Attribute writes against an unknown session fail with
/// [`Error::SessionUnavailable`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolves an existing session or creates a fresh one, returning its id.
    async fn get_or_create(&self, requested: Option<&str>) -> Result<String, Error>;

    async fn attribute(&self, session_id: &str, key: &str)
        -> Result<Option<SessionValue>, Error>;

    async fn set_attribute(
        &self,
        session_id: &str,
        key: &str,
        value: SessionValue,
    ) -> Result<(), Error>;

    async fn invalidate(&self, session_id: &str) -> Result<(), Error>;
}
