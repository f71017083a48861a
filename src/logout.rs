use std::sync::Arc;

use tracing::debug;

use crate::auth::ResponseAction;
use crate::configuration::Configuration;
use crate::error::Error;
use crate::request::AuthContext;
use crate::session::SessionStore;

/// Terminates sessions for requests carrying the logout URI marker.
///
/// Invalidating the session drops the bound identity and any archived saved
/// request in one stroke.
pub struct LogoutManager {
    sessions: Arc<dyn SessionStore>,
    marker: String,
    page: Option<String>,
}

impl LogoutManager {
    pub fn new(config: &Configuration, sessions: Arc<dyn SessionStore>) -> Self {
        LogoutManager {
            sessions,
            marker: config.logout.marker.clone(),
            page: config.logout.page.clone(),
        }
    }

    pub fn is_logout_request(&self, ctx: &AuthContext) -> bool {
        ctx.request_uri().contains(&self.marker)
    }

    /// Invalidates the session and redirects to the configured logout page,
    /// or the context path when none is set. Requests without the marker pass
    /// through untouched; a logout without a session is a hard error.
    pub async fn logout(&self, ctx: &AuthContext) -> Result<ResponseAction, Error> {
        if !self.is_logout_request(ctx) {
            return Ok(ResponseAction::None);
        }

        let session_id = ctx.session_id()?;
        self.sessions.invalidate(session_id).await?;
        debug!(session_id, "Session terminated");

        let target = self.page.clone().unwrap_or_else(|| {
            let context_path = ctx.context_path();
            if context_path.is_empty() {
                "/".to_string()
            } else {
                context_path.to_string()
            }
        });

        Ok(ResponseAction::Redirect(target))
    }
}
