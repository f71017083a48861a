use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::Error;
use crate::request::{AuthContext, SavedRequest};
use crate::session::{SessionStore, SessionValue, SAVED_REQUEST_ATTRIBUTE};

/// Cache of pre-authentication request snapshots, keyed by session id.
///
/// A snapshot lives here only between the challenge that triggered it and the
/// next credential submission; on success it is moved into session storage
/// exactly once, on failure it is discarded. Removal is atomic per key, so
/// concurrent requests for the same session observe at most one successful pop
/// per save.
pub struct RequestCache {
    entries: DashMap<String, SavedRequest>,
    sessions: Arc<dyn SessionStore>,
}

impl RequestCache {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        RequestCache {
            entries: DashMap::new(),
            sessions,
        }
    }

    /// Snapshots the request under its session id, replacing any previous
    /// snapshot for that session.
    pub fn save(&self, ctx: &AuthContext) -> Result<(), Error> {
        let session_id = ctx.session_id()?;
        debug!(session_id, uri = ctx.request_uri(), "Caching request before challenge");
        self.entries
            .insert(session_id.to_string(), SavedRequest::from_context(ctx));
        Ok(())
    }

    /// Atomically removes the snapshot for the session and archives it as a
    /// session attribute for later inspection by application code.
    pub async fn pop_and_archive(
        &self,
        session_id: &str,
    ) -> Result<Option<SavedRequest>, Error> {
        let Some((_, saved)) = self.entries.remove(session_id) else {
            return Ok(None);
        };

        self.sessions
            .set_attribute(
                session_id,
                SAVED_REQUEST_ATTRIBUTE,
                SessionValue::SavedRequest(saved.clone()),
            )
            .await?;

        Ok(Some(saved))
    }

    /// Drops the snapshot without archiving it, ending the challenge window
    /// after a failed credential submission.
    pub fn discard(&self, session_id: &str) {
        self.entries.remove(session_id);
    }
}
