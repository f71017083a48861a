use std::collections::HashMap;

use hyper::http::request::Parts;
use hyper::Method;
use tracing::debug;

use crate::error::Error;
use crate::request_ext::HeaderExt;

/// Per-request working state handed to the authentication machinery.
///
/// Wraps the request head together with the adapter-resolved session id, the
/// deployment context path and the decoded parameter map (query string plus,
/// when supplied, an urlencoded form body). Created per inbound request and
/// discarded when the request completes.
pub struct AuthContext {
    parts: Parts,
    session_id: Option<String>,
    context_path: String,
    parameters: HashMap<String, Vec<String>>,
}

impl AuthContext {
    pub fn new(parts: Parts, session_id: Option<String>) -> Self {
        let parameters = parse_parameters(parts.uri.query());

        AuthContext {
            parts,
            session_id,
            context_path: String::new(),
            parameters,
        }
    }

    /// Merges an `application/x-www-form-urlencoded` body into the parameter
    /// map. Undecodable bodies are ignored.
    #[must_use]
    pub fn with_form_body(mut self, body: &[u8]) -> Self {
        match std::str::from_utf8(body) {
            Ok(body) => {
                for (name, values) in parse_parameters(Some(body)) {
                    self.parameters.entry(name).or_default().extend(values);
                }
            }
            Err(err) => debug!("Ignoring undecodable form body: {err}"),
        }
        self
    }

    /// Sets the deployment context path the request URI is prefixed with.
    #[must_use]
    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Full request path, context path included.
    pub fn request_uri(&self) -> &str {
        self.parts.uri.path()
    }

    /// Request path with the context path stripped; this is what resource
    /// rules match against.
    pub fn relative_path(&self) -> &str {
        self.request_uri()
            .strip_prefix(&self.context_path)
            .unwrap_or_else(|| self.request_uri())
    }

    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    pub fn scheme(&self) -> Option<&str> {
        self.parts.uri.scheme_str()
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// The session id, or `SessionUnavailable` when the adapter did not
    /// establish one.
    pub fn session_id(&self) -> Result<&str, Error> {
        self.session_id.as_deref().ok_or_else(|| {
            Error::SessionUnavailable("no session established for this request".to_string())
        })
    }

    /// First value of the named request parameter.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn parameters(&self) -> &HashMap<String, Vec<String>> {
        &self.parameters
    }
}

fn parse_parameters(encoded: Option<&str>) -> HashMap<String, Vec<String>> {
    let mut parameters: HashMap<String, Vec<String>> = HashMap::new();

    let Some(encoded) = encoded else {
        return parameters;
    };

    match serde_urlencoded::from_str::<Vec<(String, String)>>(encoded) {
        Ok(pairs) => {
            for (name, value) in pairs {
                parameters.entry(name).or_default().push(value);
            }
        }
        Err(err) => debug!("Ignoring unparsable parameter string: {err}"),
    }

    parameters
}

/// Snapshot of a request taken before a challenge was issued, replayed once
/// authentication succeeds.
///
/// Headers keep a single value per name; when a header is repeated the last
/// value wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedRequest {
    method: String,
    scheme: Option<String>,
    context_path: String,
    request_uri: String,
    query_string: Option<String>,
    headers: HashMap<String, String>,
    cookies: Vec<(String, String)>,
    parameters: HashMap<String, Vec<String>>,
}

impl SavedRequest {
    pub fn from_context(ctx: &AuthContext) -> Self {
        let mut headers = HashMap::new();
        for (name, value) in &ctx.parts().headers {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        SavedRequest {
            method: ctx.method().as_str().to_string(),
            scheme: ctx.scheme().map(ToString::to_string),
            context_path: ctx.context_path().to_string(),
            request_uri: ctx.request_uri().to_string(),
            query_string: ctx.query().map(ToString::to_string),
            headers,
            cookies: ctx.parts().cookies(),
            parameters: ctx.parameters().clone(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn request_uri(&self) -> &str {
        &self.request_uri
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    pub fn parameters(&self) -> &HashMap<String, Vec<String>> {
        &self.parameters
    }
}

#[cfg(test)]
mod tests {
    use hyper::header::{COOKIE, USER_AGENT};
    use hyper::Request;

    use super::*;

    fn context(uri: &str) -> AuthContext {
        let request = Request::builder().uri(uri).body(()).unwrap();
        let (parts, ()) = request.into_parts();
        AuthContext::new(parts, Some("session-1".to_string()))
    }

    #[test]
    fn test_query_parameters() {
        let ctx = context("/app/search?q=rust&tag=web&tag=auth");

        assert_eq!(ctx.parameter("q"), Some("rust"));
        assert_eq!(
            ctx.parameters().get("tag"),
            Some(&vec!["web".to_string(), "auth".to_string()])
        );
        assert_eq!(ctx.parameter("missing"), None);
    }

    #[test]
    fn test_form_body_parameters() {
        let ctx = context("/app/j_security_check")
            .with_form_body(b"j_username=aladdin&j_password=Open%20Sesame");

        assert_eq!(ctx.parameter("j_username"), Some("aladdin"));
        assert_eq!(ctx.parameter("j_password"), Some("Open Sesame"));
    }

    #[test]
    fn test_relative_path_strips_context_path() {
        let ctx = context("/app/secure/index.html").with_context_path("/app");

        assert_eq!(ctx.request_uri(), "/app/secure/index.html");
        assert_eq!(ctx.relative_path(), "/secure/index.html");
    }

    #[test]
    fn test_relative_path_without_context_path() {
        let ctx = context("/secure/index.html");

        assert_eq!(ctx.relative_path(), "/secure/index.html");
    }

    #[test]
    fn test_session_id_missing() {
        let request = Request::builder().uri("/index.html").body(()).unwrap();
        let (parts, ()) = request.into_parts();
        let ctx = AuthContext::new(parts, None);

        assert!(matches!(
            ctx.session_id(),
            Err(Error::SessionUnavailable(_))
        ));
    }

    #[test]
    fn test_saved_request_snapshot() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("http://localhost/app/reports?year=2012")
            .header(USER_AGENT, "test-agent/1.0")
            .header(COOKIE, "JSESSIONID=abc123")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();
        let ctx = AuthContext::new(parts, Some("session-1".to_string())).with_context_path("/app");

        let saved = SavedRequest::from_context(&ctx);

        assert_eq!(saved.method(), "POST");
        assert_eq!(saved.scheme(), Some("http"));
        assert_eq!(saved.context_path(), "/app");
        assert_eq!(saved.request_uri(), "/app/reports");
        assert_eq!(saved.query_string(), Some("year=2012"));
        assert_eq!(
            saved.headers().get("user-agent"),
            Some(&"test-agent/1.0".to_string())
        );
        assert_eq!(
            saved.cookies(),
            &[("JSESSIONID".to_string(), "abc123".to_string())]
        );
        assert_eq!(
            saved.parameters().get("year"),
            Some(&vec!["2012".to_string()])
        );
    }

    #[test]
    fn test_saved_request_repeated_header_keeps_last_value() {
        let request = Request::builder()
            .uri("/index.html")
            .header("x-forwarded-for", "10.0.0.1")
            .header("x-forwarded-for", "10.0.0.2")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();
        let ctx = AuthContext::new(parts, None);

        let saved = SavedRequest::from_context(&ctx);

        assert_eq!(
            saved.headers().get("x-forwarded-for"),
            Some(&"10.0.0.2".to_string())
        );
    }
}
