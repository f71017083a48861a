use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use super::{AuthScheme, ResponseAction};
use crate::credential::Credential;
use crate::error::Error;
use crate::request::AuthContext;
use crate::request_ext::HeaderExt;

const BASIC_SCHEME: &str = "Basic";

/// HTTP Basic authentication (RFC 7617).
pub struct BasicScheme {
    realm: String,
}

impl BasicScheme {
    pub fn new(realm: impl Into<String>) -> Self {
        BasicScheme {
            realm: realm.into(),
        }
    }
}

impl AuthScheme for BasicScheme {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn is_credential_request(&self, ctx: &AuthContext) -> bool {
        ctx.parts()
            .authorization()
            .is_some_and(|header| !header.is_empty())
    }

    fn extract_credential(&self, ctx: &AuthContext) -> Result<Credential, Error> {
        let header = ctx.parts().authorization().ok_or_else(|| {
            Error::MalformedCredential("missing Authorization header".to_string())
        })?;

        let (scheme, payload) = header.split_once(' ').ok_or_else(|| {
            Error::MalformedCredential("Authorization header has no payload".to_string())
        })?;

        if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
            return Err(Error::MalformedCredential(format!(
                "unsupported authorization scheme '{scheme}'"
            )));
        }

        let decoded = BASE64_STANDARD
            .decode(payload.trim())
            .map_err(|err| Error::MalformedCredential(format!("invalid base64 payload: {err}")))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|err| Error::MalformedCredential(format!("non-UTF-8 payload: {err}")))?;

        let Some((username, password)) = decoded.split_once(':') else {
            return Err(Error::MalformedCredential(
                "payload has no ':' separator".to_string(),
            ));
        };

        if username.is_empty() {
            return Err(Error::MalformedCredential("empty username".to_string()));
        }

        Ok(Credential::UsernamePassword {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn challenge(&self, _ctx: &AuthContext) -> Result<ResponseAction, Error> {
        Ok(ResponseAction::Challenge(format!(
            "basic realm=\"{}\"",
            self.realm
        )))
    }
}

#[cfg(test)]
mod tests {
    use hyper::header::AUTHORIZATION;
    use hyper::Request;

    use super::*;

    fn context(authorization: Option<&str>) -> AuthContext {
        let mut builder = Request::builder().uri("/secure/index.html");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        AuthContext::new(parts, Some("session-1".to_string()))
    }

    #[test]
    fn test_is_credential_request() {
        let scheme = BasicScheme::new("Test Realm");

        assert!(scheme.is_credential_request(&context(Some("Basic abc"))));
        assert!(!scheme.is_credential_request(&context(Some(""))));
        assert!(!scheme.is_credential_request(&context(None)));
    }

    #[test]
    fn test_extract_credential() {
        let scheme = BasicScheme::new("Test Realm");

        // base64("Aladdin:Open Sesame")
        let ctx = context(Some("Basic QWxhZGRpbjpPcGVuIFNlc2FtZQ=="));
        let credential = scheme.extract_credential(&ctx).unwrap();

        assert_eq!(
            credential,
            Credential::UsernamePassword {
                username: "Aladdin".to_string(),
                password: "Open Sesame".to_string(),
            }
        );
    }

    #[test]
    fn test_extract_credential_scheme_is_case_insensitive() {
        let scheme = BasicScheme::new("Test Realm");

        let ctx = context(Some("bAsIc QWxhZGRpbjpPcGVuIFNlc2FtZQ=="));
        let credential = scheme.extract_credential(&ctx).unwrap();

        assert_eq!(credential.username(), "Aladdin");
    }

    #[test]
    fn test_extract_credential_rejects_other_schemes() {
        let scheme = BasicScheme::new("Test Realm");

        let ctx = context(Some("Bearer some-token"));
        let result = scheme.extract_credential(&ctx);

        assert!(matches!(result, Err(Error::MalformedCredential(_))));
    }

    #[test]
    fn test_extract_credential_rejects_bad_base64() {
        let scheme = BasicScheme::new("Test Realm");

        let ctx = context(Some("Basic !!not-base64!!"));
        let result = scheme.extract_credential(&ctx);

        assert!(matches!(result, Err(Error::MalformedCredential(_))));
    }

    #[test]
    fn test_extract_credential_rejects_missing_colon() {
        let scheme = BasicScheme::new("Test Realm");

        // base64("nocolon")
        let ctx = context(Some("Basic bm9jb2xvbg=="));
        let result = scheme.extract_credential(&ctx);

        assert!(matches!(result, Err(Error::MalformedCredential(_))));
    }

    #[test]
    fn test_password_may_contain_colons() {
        let scheme = BasicScheme::new("Test Realm");

        // base64("user:pa:ss")
        let ctx = context(Some("Basic dXNlcjpwYTpzcw=="));
        let credential = scheme.extract_credential(&ctx).unwrap();

        assert_eq!(
            credential,
            Credential::UsernamePassword {
                username: "user".to_string(),
                password: "pa:ss".to_string(),
            }
        );
    }

    #[test]
    fn test_challenge_header() {
        let scheme = BasicScheme::new("Test Realm");

        let action = scheme.challenge(&context(None)).unwrap();

        assert_eq!(
            action,
            ResponseAction::Challenge("basic realm=\"Test Realm\"".to_string())
        );
    }

    #[test]
    fn test_invalid_credentials_re_challenge() {
        let scheme = BasicScheme::new("Test Realm");

        let action = scheme.on_invalid_credentials(&context(None)).unwrap();

        assert!(matches!(action, ResponseAction::Challenge(header) if header.starts_with("basic realm=")));
    }
}
