pub mod nonce;

pub use nonce::{NonceManager, NonceValidation, DEFAULT_NONCE_MAX_AGE};

use std::time::Duration;

use md5::{Digest, Md5};
use tracing::debug;
use uuid::Uuid;

use super::{AuthScheme, ResponseAction};
use crate::configuration::DigestConfig;
use crate::credential::{Credential, DigestCredential};
use crate::error::Error;
use crate::request::AuthContext;
use crate::request_ext::HeaderExt;

/// The single supported quality-of-protection value.
pub const QOP_AUTH: &str = "auth";

const DIGEST_SCHEME: &str = "Digest";

/// HTTP Digest authentication (RFC 2617, MD5 / qop=auth).
pub struct DigestScheme {
    realm: String,
    opaque: String,
    domain: Option<String>,
    nonce_max_age: Duration,
    nonces: NonceManager,
}

impl DigestScheme {
    pub fn new(realm: impl Into<String>, config: &DigestConfig) -> Self {
        DigestScheme {
            realm: realm.into(),
            opaque: config
                .opaque
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            domain: config.domain.clone(),
            nonce_max_age: Duration::from_millis(config.nonce_max_age_ms),
            nonces: NonceManager::new(),
        }
    }

    pub fn opaque(&self) -> &str {
        &self.opaque
    }

    pub fn nonces(&self) -> &NonceManager {
        &self.nonces
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// RFC 2617 §3.2.2 response computation.
///
/// `HA1 = MD5(username:realm:password)`, `HA2 = MD5(method:uri)`; with a qop
/// the response covers `nonce:nc:cnonce:qop` between the two hashes.
pub fn expected_response(credential: &DigestCredential, password: &str) -> String {
    let ha1 = md5_hex(&format!(
        "{}:{}:{password}",
        credential.username, credential.realm
    ));
    let ha2 = md5_hex(&format!("{}:{}", credential.method, credential.uri));

    match credential.qop.as_deref() {
        Some(qop) => md5_hex(&format!(
            "{ha1}:{}:{}:{}:{qop}:{ha2}",
            credential.nonce,
            credential.nc.as_deref().unwrap_or(""),
            credential.cnonce.as_deref().unwrap_or(""),
        )),
        None => md5_hex(&format!("{ha1}:{}:{ha2}", credential.nonce)),
    }
}

/// Splits a digest payload on commas sitting outside quoted strings.
fn quote_tokenize(payload: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (idx, ch) in payload.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                tokens.push(&payload[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    tokens.push(&payload[start..]);

    tokens
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_authorization(header: &str, method: &str) -> Result<DigestCredential, Error> {
    let payload = if header.len() >= DIGEST_SCHEME.len()
        && header[..DIGEST_SCHEME.len()].eq_ignore_ascii_case(DIGEST_SCHEME)
    {
        header[DIGEST_SCHEME.len()..].trim()
    } else {
        header.trim()
    };

    if payload.is_empty() {
        return Err(Error::MalformedCredential(
            "empty digest payload".to_string(),
        ));
    }

    let mut credential = DigestCredential {
        method: method.to_string(),
        ..DigestCredential::default()
    };

    for token in quote_tokenize(payload) {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        let value = unquote(value.trim()).to_string();

        match key.trim() {
            "username" => credential.username = value,
            "realm" => credential.realm = value,
            "nonce" => credential.nonce = value,
            "uri" => credential.uri = value,
            "response" => credential.response = value,
            "qop" => credential.qop = Some(value),
            "nc" => credential.nc = Some(value),
            "cnonce" => credential.cnonce = Some(value),
            "opaque" => credential.opaque = Some(value),
            other => debug!(field = other, "Ignoring unknown digest field"),
        }
    }

    for (field, value) in [
        ("username", &credential.username),
        ("realm", &credential.realm),
        ("nonce", &credential.nonce),
        ("uri", &credential.uri),
        ("response", &credential.response),
    ] {
        if value.is_empty() {
            return Err(Error::MalformedCredential(format!(
                "digest field '{field}' is missing"
            )));
        }
    }

    Ok(credential)
}

impl AuthScheme for DigestScheme {
    fn name(&self) -> &'static str {
        "digest"
    }

    fn is_credential_request(&self, ctx: &AuthContext) -> bool {
        ctx.parts().authorization().is_some()
    }

    fn extract_credential(&self, ctx: &AuthContext) -> Result<Credential, Error> {
        let header = ctx.parts().authorization().ok_or_else(|| {
            Error::MalformedCredential("missing Authorization header".to_string())
        })?;

        let credential = parse_authorization(&header, ctx.method().as_str())?;
        Ok(Credential::Digest(credential))
    }

    fn verify_credential(&self, ctx: &AuthContext, credential: &Credential) -> Result<(), Error> {
        let Credential::Digest(digest) = credential else {
            return Err(Error::Internal(
                "digest scheme received a non-digest credential".to_string(),
            ));
        };

        if let Some(opaque) = &digest.opaque {
            if opaque != &self.opaque {
                return Err(Error::InvalidCredential("opaque mismatch".to_string()));
            }
        }

        if digest.realm != self.realm {
            return Err(Error::InvalidCredential(format!(
                "realm '{}' does not match '{}'",
                digest.realm, self.realm
            )));
        }

        if digest.qop.as_deref() != Some(QOP_AUTH) {
            return Err(Error::InvalidCredential(format!(
                "unsupported qop '{}'",
                digest.qop.as_deref().unwrap_or("")
            )));
        }

        let session_id = ctx.session_id()?;
        match self
            .nonces
            .validate(session_id, &digest.nonce, self.nonce_max_age)
        {
            NonceValidation::Valid => Ok(()),
            NonceValidation::Stale => Err(Error::InvalidCredential("stale nonce".to_string())),
            NonceValidation::Invalid => Err(Error::InvalidCredential("unknown nonce".to_string())),
        }
    }

    fn challenge(&self, ctx: &AuthContext) -> Result<ResponseAction, Error> {
        let session_id = ctx.session_id()?;
        let nonce = self.nonces.issue(session_id);

        let domain = self.domain.clone().unwrap_or_else(|| {
            let context_path = ctx.context_path();
            if context_path.is_empty() {
                "/".to_string()
            } else {
                context_path.to_string()
            }
        });

        // stale is always advertised as "false", even when the nonce being
        // replaced had merely aged out.
        let header = format!(
            "Digest realm=\"{}\",domain=\"{domain}\",nonce=\"{nonce}\",algorithm=MD5,qop={QOP_AUTH},opaque=\"{}\",stale=\"false\"",
            self.realm, self.opaque
        );

        Ok(ResponseAction::Challenge(header))
    }
}
