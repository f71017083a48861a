use std::sync::Arc;

use hyper::StatusCode;
use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;
use x509_parser::x509::X509Name;

use super::{AuthScheme, ResponseAction};
use crate::configuration::ClientCertConfig;
use crate::credential::Credential;
use crate::error::Error;
use crate::request::AuthContext;

/// Extension type carrying the peer certificate chain (DER, leaf first)
/// attached to the request by the transport layer.
#[derive(Clone)]
pub struct PeerCertificates(pub Arc<Vec<Vec<u8>>>);

/// Client-certificate authentication.
///
/// Certificate negotiation and chain validation belong to the TLS layer; this
/// scheme only derives a principal from a certificate the transport already
/// accepted. It issues no challenge of its own.
pub struct ClientCertScheme {
    use_cn_as_principal: bool,
    use_certificate_validation: bool,
}

impl ClientCertScheme {
    pub fn new(config: &ClientCertConfig) -> Self {
        ClientCertScheme {
            use_cn_as_principal: config.use_cn_as_principal,
            use_certificate_validation: config.use_certificate_validation,
        }
    }

    fn leaf_certificate(ctx: &AuthContext) -> Option<&Vec<u8>> {
        ctx.parts()
            .extensions
            .get::<PeerCertificates>()
            .and_then(|chain| chain.0.first())
    }
}

/// Subject name, falling back to the issuer when the subject is empty.
fn certificate_principal<'a>(certificate: &'a X509Certificate<'a>) -> &'a X509Name<'a> {
    let subject = certificate.subject();
    if subject.iter_rdn().next().is_none() {
        certificate.issuer()
    } else {
        subject
    }
}

fn common_name(name: &X509Name) -> Option<String> {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(String::from)
}

impl AuthScheme for ClientCertScheme {
    fn name(&self) -> &'static str {
        "client-cert"
    }

    fn is_credential_request(&self, ctx: &AuthContext) -> bool {
        Self::leaf_certificate(ctx).is_some()
    }

    fn extract_credential(&self, ctx: &AuthContext) -> Result<Credential, Error> {
        let der = Self::leaf_certificate(ctx).ok_or_else(|| {
            Error::MalformedCredential("no client certificate attached".to_string())
        })?;

        let (_, certificate) = X509Certificate::from_der(der).map_err(|err| {
            debug!("Failed to parse client certificate: {err:?}");
            Error::MalformedCredential(format!("unparsable client certificate: {err:?}"))
        })?;

        let principal = certificate_principal(&certificate);

        if self.use_cn_as_principal && !self.use_certificate_validation {
            let username = common_name(principal).ok_or_else(|| {
                Error::MalformedCredential("certificate carries no CN".to_string())
            })?;
            return Ok(Credential::Trusted { username });
        }

        Ok(Credential::Certificate {
            username: principal.to_string(),
            der: der.clone(),
        })
    }

    fn challenge(&self, _ctx: &AuthContext) -> Result<ResponseAction, Error> {
        // absence of a certificate is the transport's failure to negotiate one
        Ok(ResponseAction::Error(StatusCode::UNAUTHORIZED))
    }
}

#[cfg(test)]
mod tests {
    use hyper::Request;

    use super::*;

    fn generate_test_certificate() -> Vec<u8> {
        use std::process::Command;

        let output = Command::new("openssl")
            .args([
                "req",
                "-x509",
                "-newkey",
                "rsa:2048",
                "-nodes",
                "-keyout",
                "/dev/null",
                "-out",
                "/dev/stdout",
                "-days",
                "1",
                "-subj",
                "/CN=jduke/O=Acme",
                "-outform",
                "DER",
            ])
            .output()
            .expect("Failed to generate test certificate");

        assert!(
            output.status.success(),
            "OpenSSL failed to generate certificate"
        );
        output.stdout
    }

    fn context(chain: Option<Vec<Vec<u8>>>) -> AuthContext {
        let mut request = Request::builder()
            .uri("/secure/index.html")
            .body(())
            .unwrap();
        if let Some(chain) = chain {
            request
                .extensions_mut()
                .insert(PeerCertificates(Arc::new(chain)));
        }
        let (parts, ()) = request.into_parts();
        AuthContext::new(parts, Some("session-1".to_string()))
    }

    #[test]
    fn test_is_credential_request_requires_certificate() {
        let scheme = ClientCertScheme::new(&ClientCertConfig::default());

        assert!(!scheme.is_credential_request(&context(None)));
        assert!(!scheme.is_credential_request(&context(Some(Vec::new()))));
        assert!(scheme.is_credential_request(&context(Some(vec![vec![1, 2, 3]]))));
    }

    #[test]
    fn test_extract_trusted_principal_from_cn() {
        let scheme = ClientCertScheme::new(&ClientCertConfig::default());
        let ctx = context(Some(vec![generate_test_certificate()]));

        let credential = scheme.extract_credential(&ctx).unwrap();

        assert_eq!(
            credential,
            Credential::Trusted {
                username: "jduke".to_string(),
            }
        );
    }

    #[test]
    fn test_extract_certificate_credential_for_backend_validation() {
        let config = ClientCertConfig {
            use_cn_as_principal: false,
            use_certificate_validation: true,
        };
        let scheme = ClientCertScheme::new(&config);
        let der = generate_test_certificate();
        let ctx = context(Some(vec![der.clone()]));

        let Credential::Certificate { username, der: extracted } =
            scheme.extract_credential(&ctx).unwrap()
        else {
            panic!("expected certificate credential");
        };

        assert!(username.contains("CN=jduke"));
        assert_eq!(extracted, der);
    }

    #[test]
    fn test_extract_rejects_malformed_certificate() {
        let scheme = ClientCertScheme::new(&ClientCertConfig::default());
        let ctx = context(Some(vec![vec![0u8; 64]]));

        let result = scheme.extract_credential(&ctx);

        assert!(matches!(result, Err(Error::MalformedCredential(_))));
    }

    #[test]
    fn test_challenge_is_a_bare_401() {
        let scheme = ClientCertScheme::new(&ClientCertConfig::default());

        let action = scheme.challenge(&context(None)).unwrap();

        assert_eq!(action, ResponseAction::Error(StatusCode::UNAUTHORIZED));
    }
}
