
use std::sync::Arc;

use hyper::StatusCode;
use tracing::{debug, instrument, warn};

use super::{
    AuthOutcome, AuthScheme, BasicScheme, ClientCertScheme, DigestScheme, FormScheme,
    ResponseAction,
};
use crate::backend::IdentityBackend;
use crate::configuration::{Configuration, SchemeConfig};
use crate::error::Error;
use crate::identity::Identity;
use crate::policy::ResourcePolicy;
use crate::request::AuthContext;
use crate::request_cache::RequestCache;
use crate::session::{SessionStore, SessionValue, IDENTITY_ATTRIBUTE};

const DEFAULT_PAGE: &str = "/";

/// Orchestrates authentication and authorization for inbound requests.
///
/// One state machine shared by every scheme: resolve the resource's
/// protection level, short-circuit already-authenticated sessions, otherwise
/// drive the challenge / credential-extraction / backend-validation exchange
/// and replay the originally requested URI after a successful login.
pub struct AuthController {
    policy: ResourcePolicy,
    scheme: Arc<dyn AuthScheme>,
    backend: Arc<dyn IdentityBackend>,
    sessions: Arc<dyn SessionStore>,
    request_cache: RequestCache,
    default_page: String,
}

impl AuthController {
    pub fn new(
        config: &Configuration,
        backend: Arc<dyn IdentityBackend>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, Error> {
        if !config.default_page.starts_with('/') {
            return Err(Error::Initialization(format!(
                "default page '{}' must start with '/'",
                config.default_page
            )));
        }

        if let SchemeConfig::Form(form) = &config.scheme {
            for (name, page) in [("login", &form.login_page), ("error", &form.error_page)] {
                if !page.starts_with('/') {
                    return Err(Error::Initialization(format!(
                        "form {name} page '{page}' must start with '/'"
                    )));
                }
            }
        }

        Ok(AuthController {
            policy: ResourcePolicy::new(config.resources.clone()),
            scheme: Self::build_scheme(config),
            backend,
            sessions: sessions.clone(),
            request_cache: RequestCache::new(sessions),
            default_page: config.default_page.clone(),
        })
    }

    fn build_scheme(config: &Configuration) -> Arc<dyn AuthScheme> {
        match &config.scheme {
            SchemeConfig::Basic => Arc::new(BasicScheme::new(&config.realm)),
            SchemeConfig::Digest(digest) => Arc::new(DigestScheme::new(&config.realm, digest)),
            SchemeConfig::Form(form) => Arc::new(FormScheme::new(form)),
            SchemeConfig::ClientCert(client_cert) => {
                Arc::new(ClientCertScheme::new(client_cert))
            }
        }
    }

    /// Runs one request through the state machine.
    ///
    /// `Continue` means a challenge went out and the exchange resumes on a
    /// follow-up request; `Success` and `InvalidCredentials` are terminal for
    /// the exchange. Hard failures (session or backend unavailable) surface
    /// as errors and map to generic responses upstream.
    #[instrument(skip(self, ctx), fields(scheme = self.scheme.name(), method = %ctx.method(), path = ctx.request_uri()))]
    pub async fn process(
        &self,
        ctx: &AuthContext,
    ) -> Result<(AuthOutcome, ResponseAction), Error> {
        let resource = self.policy.classify(ctx.relative_path());

        if let Some(identity) = self.session_identity(ctx).await? {
            if resource.requires_authorization() && !resource.is_allowed(&identity) {
                debug!(
                    username = identity.username(),
                    pattern = %resource.pattern,
                    "Authenticated identity lacks a required role"
                );
                return Ok((
                    AuthOutcome::Success,
                    ResponseAction::Error(StatusCode::FORBIDDEN),
                ));
            }

            return Ok((AuthOutcome::Success, ResponseAction::None));
        }

        if !resource.requires_authentication() {
            return Ok((AuthOutcome::Success, ResponseAction::None));
        }

        if !self.scheme.is_credential_request(ctx) {
            self.request_cache.save(ctx)?;
            let action = self.scheme.challenge(ctx)?;
            return Ok((AuthOutcome::Continue, action));
        }

        let credential = match self.scheme.extract_credential(ctx) {
            Ok(credential) => credential,
            Err(Error::MalformedCredential(reason)) => {
                debug!(%reason, "Re-challenging after credential extraction failure");
                let action = self.scheme.challenge(ctx)?;
                return Ok((AuthOutcome::Continue, action));
            }
            Err(err) => return Err(err),
        };

        if let Err(err) = self.scheme.verify_credential(ctx, &credential) {
            return match err {
                Error::InvalidCredential(reason) => {
                    debug!(
                        username = credential.username(),
                        %reason,
                        "Credential rejected before backend validation"
                    );
                    self.reject(ctx)
                }
                other => Err(other),
            };
        }

        match self.backend.validate(&credential).await {
            Ok(identity) => self.establish(ctx, identity).await,
            Err(Error::InvalidCredential(reason)) => {
                debug!(
                    username = credential.username(),
                    %reason,
                    "Backend rejected credential"
                );
                self.reject(ctx)
            }
            Err(err) => {
                warn!(
                    username = credential.username(),
                    "Identity backend failure: {err}"
                );
                Err(err)
            }
        }
    }

    /// Binds the identity to the session, replays the saved request and
    /// computes the post-login redirect.
    async fn establish(
        &self,
        ctx: &AuthContext,
        identity: Identity,
    ) -> Result<(AuthOutcome, ResponseAction), Error> {
        let session_id = ctx.session_id()?;

        self.sessions
            .set_attribute(
                session_id,
                IDENTITY_ATTRIBUTE,
                SessionValue::Identity(identity.clone()),
            )
            .await?;

        let saved = self.request_cache.pop_and_archive(session_id).await?;

        // an explicitly configured landing page beats the replayed URI
        let target = match saved {
            Some(saved) if self.default_page == DEFAULT_PAGE => saved.request_uri().to_string(),
            _ => format!("{}{}", ctx.context_path(), self.default_page),
        };

        debug!(username = identity.username(), %target, "Authentication succeeded");
        Ok((AuthOutcome::Success, ResponseAction::Redirect(target)))
    }

    /// Ends the challenge window after a rejected credential.
    fn reject(&self, ctx: &AuthContext) -> Result<(AuthOutcome, ResponseAction), Error> {
        if let Ok(session_id) = ctx.session_id() {
            self.request_cache.discard(session_id);
        }

        let action = self.scheme.on_invalid_credentials(ctx)?;
        Ok((AuthOutcome::InvalidCredentials, action))
    }

    async fn session_identity(&self, ctx: &AuthContext) -> Result<Option<Identity>, Error> {
        let Ok(session_id) = ctx.session_id() else {
            return Ok(None);
        };

        match self.sessions.attribute(session_id, IDENTITY_ATTRIBUTE).await? {
            Some(SessionValue::Identity(identity)) => Ok(Some(identity)),
            _ => Ok(None),
        }
    }
}
