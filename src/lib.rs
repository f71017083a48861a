#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

//! Authentication and access-control core for HTTP services.
//!
//! The crate decides whether an inbound request is authenticated, whether the
//! targeted resource requires protection, issues wire-correct challenges
//! (Basic, Digest, Form, client certificate), validates submitted credentials
//! against a pluggable identity backend and replays the originally requested
//! resource after a successful login.
//!
//! The HTTP server itself is out of scope: requests enter as
//! [`hyper::http::request::Parts`] wrapped in an [`AuthContext`], and every
//! decision comes back as an inert [`auth::ResponseAction`] for the hosting
//! adapter to interpret. The core performs no network I/O of its own.

pub mod auth;
pub mod backend;
pub mod configuration;
mod credential;
mod error;
mod identity;
pub mod logout;
pub mod policy;
mod request;
mod request_cache;
mod request_ext;
pub mod session;

pub use auth::{AuthController, AuthOutcome, AuthScheme, ResponseAction};
pub use credential::{Credential, DigestCredential};
pub use error::Error;
pub use identity::Identity;
pub use request::{AuthContext, SavedRequest};
pub use request_cache::RequestCache;
pub use request_ext::HeaderExt;
