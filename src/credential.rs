use std::fmt;

/// Credential material extracted from a request by an authentication scheme.
///
/// The variants are opaque to the controller; only the identity backend (and,
/// for Digest, the scheme's own pre-checks) interpret them.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    UsernamePassword {
        username: String,
        password: String,
    },
    Digest(DigestCredential),
    /// A username asserted by the transport (client-certificate CN); the
    /// backend resolves it without verifying any secret.
    Trusted {
        username: String,
    },
    /// A certificate to be validated against the backend's registered
    /// certificate for the named principal.
    Certificate {
        username: String,
        der: Vec<u8>,
    },
}

impl Credential {
    /// Principal name carried by the credential, for logging.
    pub fn username(&self) -> &str {
        match self {
            Credential::UsernamePassword { username, .. }
            | Credential::Trusted { username }
            | Credential::Certificate { username, .. } => username,
            Credential::Digest(digest) => &digest.username,
        }
    }
}

// Secrets are kept out of log output.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Credential::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credential::Digest(digest) => f.debug_tuple("Digest").field(digest).finish(),
            Credential::Trusted { username } => {
                f.debug_struct("Trusted").field("username", username).finish()
            }
            Credential::Certificate { username, der } => f
                .debug_struct("Certificate")
                .field("username", username)
                .field("der_len", &der.len())
                .finish(),
        }
    }
}

/// Fields of an `Authorization: Digest ...` header, plus the request method
/// the response hash covers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DigestCredential {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub response: String,
    pub method: String,
    pub qop: Option<String>,
    pub nc: Option<String>,
    pub cnonce: Option<String>,
    pub opaque: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_accessor() {
        let credential = Credential::UsernamePassword {
            username: "aladdin".to_string(),
            password: "open sesame".to_string(),
        };
        assert_eq!(credential.username(), "aladdin");

        let credential = Credential::Trusted {
            username: "jduke".to_string(),
        };
        assert_eq!(credential.username(), "jduke");

        let credential = Credential::Digest(DigestCredential {
            username: "Mufasa".to_string(),
            ..DigestCredential::default()
        });
        assert_eq!(credential.username(), "Mufasa");
    }

    #[test]
    fn test_debug_redacts_password() {
        let credential = Credential::UsernamePassword {
            username: "aladdin".to_string(),
            password: "open sesame".to_string(),
        };

        let debug = format!("{credential:?}");
        assert!(debug.contains("aladdin"));
        assert!(!debug.contains("open sesame"));
    }
}
