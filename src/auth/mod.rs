pub mod basic;
pub mod client_cert;
mod controller;
pub mod digest;
pub mod form;

pub use basic::BasicScheme;
pub use client_cert::{ClientCertScheme, PeerCertificates};
pub use controller::AuthController;
pub use digest::DigestScheme;
pub use form::FormScheme;

use hyper::StatusCode;

use crate::credential::Credential;
use crate::error::Error;
use crate::request::AuthContext;

/// Outcome of running one request through the authentication state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A challenge was issued; the exchange continues on a follow-up request.
    Continue,
    Success,
    InvalidCredentials,
}

/// Inert response effect for the HTTP adapter to interpret; the core never
/// touches the wire itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseAction {
    None,
    /// 401 carrying the given `WWW-Authenticate` value.
    Challenge(String),
    /// 302 to the given location.
    Redirect(String),
    /// Server-side forward to the given path.
    Forward(String),
    Error(StatusCode),
}

/// Wire-protocol strategy plugged into [`AuthController`].
///
/// A scheme decides whether a request carries its credentials, extracts them,
/// and produces the protocol's challenge. `verify_credential` hosts checks
/// that precede backend validation (Digest's opaque/realm/qop/nonce rules);
/// `on_invalid_credentials` picks the action after a rejection and defaults to
/// re-challenging.
pub trait AuthScheme: Send + Sync {
    /// Scheme label used in logs.
    fn name(&self) -> &'static str;

    fn is_credential_request(&self, ctx: &AuthContext) -> bool;

    fn extract_credential(&self, ctx: &AuthContext) -> Result<Credential, Error>;

    fn challenge(&self, ctx: &AuthContext) -> Result<ResponseAction, Error>;

    fn verify_credential(
        &self,
        _ctx: &AuthContext,
        _credential: &Credential,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn on_invalid_credentials(&self, ctx: &AuthContext) -> Result<ResponseAction, Error> {
        self.challenge(ctx)
    }
}
