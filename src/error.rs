use std::fmt;

use hyper::StatusCode;
use serde_json::json;

/// Crate-wide error taxonomy.
///
/// `MalformedCredential` and `InvalidCredential` are recoverable within the
/// authentication flow (a new challenge or an error page is issued). The
/// remaining variants are hard failures for the current request.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Initialization(String),
    /// Credential material present but unparsable.
    MalformedCredential(String),
    /// Well-formed credential rejected during validation.
    InvalidCredential(String),
    /// An operation requiring a session was invoked without one.
    SessionUnavailable(String),
    /// The identity backend could not be reached or failed unexpectedly.
    BackendUnavailable(String),
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Initialization(err) => write!(f, "{err}"),
            Error::MalformedCredential(err) => write!(f, "Malformed credential: {err}"),
            Error::InvalidCredential(err) => write!(f, "Invalid credential: {err}"),
            Error::SessionUnavailable(err) => write!(f, "Session unavailable: {err}"),
            Error::BackendUnavailable(err) => {
                write!(f, "Authentication backend unavailable: {err}")
            }
            Error::Internal(err) => write!(f, "Internal error: {err}"),
        }
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MalformedCredential(_) | Error::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
            Error::Initialization(_)
            | Error::SessionUnavailable(_)
            | Error::BackendUnavailable(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body for the HTTP adapter. Internal failures deliberately
    /// carry no detail beyond their status code.
    pub fn as_json(&self) -> serde_json::Value {
        let (code, message) = match self {
            Error::MalformedCredential(_) | Error::InvalidCredential(_) => {
                ("UNAUTHORIZED", Some("Authentication failed"))
            }
            Error::Initialization(_)
            | Error::SessionUnavailable(_)
            | Error::BackendUnavailable(_)
            | Error::Internal(_) => ("INTERNAL_SERVER_ERROR", None),
        };

        json!({
            "errors": [{
                "code": code,
                "message": message,
            }]
        })
    }
}
