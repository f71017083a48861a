use std::collections::{HashMap, HashSet};

use argon2::password_hash::PasswordHashString;
use argon2::{Argon2, PasswordVerifier};
use async_trait::async_trait;
use tracing::debug;

use super::IdentityBackend;
use crate::auth::digest;
use crate::credential::Credential;
use crate::error::Error;
use crate::identity::Identity;

/// Secret material held for a user.
#[derive(Clone, Debug)]
enum Secret {
    /// Argon2 hash; sufficient for password credentials.
    Hashed(PasswordHashString),
    /// Plaintext. Digest needs it: the response hash covers the raw password.
    Plain(String),
}

struct UserRecord {
    secret: Option<Secret>,
    roles: HashSet<String>,
    certificate: Option<Vec<u8>>,
}

/// In-memory identity backend for tests and small deployments.
#[derive(Default)]
pub struct MemoryBackend {
    users: HashMap<String, UserRecord>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            users: HashMap::new(),
        }
    }

    /// Registers a user with a plaintext password.
    pub fn add_user<I, S>(&mut self, username: impl Into<String>, password: impl Into<String>, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.insert(
            username.into(),
            UserRecord {
                secret: Some(Secret::Plain(password.into())),
                roles: roles.into_iter().map(Into::into).collect(),
                certificate: None,
            },
        );
    }

    /// Registers a user with an Argon2 password hash string.
    pub fn add_user_hashed<I, S>(
        &mut self,
        username: impl Into<String>,
        password_hash: &str,
        roles: I,
    ) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let password_hash = PasswordHashString::new(password_hash)
            .map_err(|err| Error::Initialization(format!("invalid password hash: {err}")))?;

        self.users.insert(
            username.into(),
            UserRecord {
                secret: Some(Secret::Hashed(password_hash)),
                roles: roles.into_iter().map(Into::into).collect(),
                certificate: None,
            },
        );
        Ok(())
    }

    /// Registers a user without a secret, resolvable through
    /// [`Credential::Trusted`] only.
    pub fn add_trusted_user<I, S>(&mut self, username: impl Into<String>, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.insert(
            username.into(),
            UserRecord {
                secret: None,
                roles: roles.into_iter().map(Into::into).collect(),
                certificate: None,
            },
        );
    }

    /// Registers a user together with its client certificate (DER).
    pub fn add_certificate<I, S>(&mut self, username: impl Into<String>, der: Vec<u8>, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.insert(
            username.into(),
            UserRecord {
                secret: None,
                roles: roles.into_iter().map(Into::into).collect(),
                certificate: Some(der),
            },
        );
    }

    fn user(&self, username: &str) -> Result<&UserRecord, Error> {
        self.users.get(username).ok_or_else(|| {
            debug!(username, "Unknown user");
            Error::InvalidCredential(format!("unknown user '{username}'"))
        })
    }

    fn identity(username: &str, record: &UserRecord) -> Identity {
        Identity::new(username, record.roles.iter().cloned())
    }

    fn verify_password(record: &UserRecord, password: &str) -> bool {
        match &record.secret {
            Some(Secret::Plain(expected)) => expected == password,
            Some(Secret::Hashed(hash)) => Argon2::default()
                .verify_password(password.as_bytes(), &hash.password_hash())
                .is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl IdentityBackend for MemoryBackend {
    async fn validate(&self, credential: &Credential) -> Result<Identity, Error> {
        match credential {
            Credential::UsernamePassword { username, password } => {
                let record = self.user(username)?;

                if Self::verify_password(record, password) {
                    Ok(Self::identity(username, record))
                } else {
                    debug!(username, "Password verification failed");
                    Err(Error::InvalidCredential("password mismatch".to_string()))
                }
            }
            Credential::Digest(submitted) => {
                let record = self.user(&submitted.username)?;

                let Some(Secret::Plain(password)) = &record.secret else {
                    debug!(
                        username = submitted.username,
                        "Digest validation needs a recoverable secret"
                    );
                    return Err(Error::InvalidCredential(
                        "no recoverable secret for digest validation".to_string(),
                    ));
                };

                let expected = digest::expected_response(submitted, password);
                if expected.eq_ignore_ascii_case(&submitted.response) {
                    Ok(Self::identity(&submitted.username, record))
                } else {
                    debug!(username = submitted.username, "Digest response mismatch");
                    Err(Error::InvalidCredential("digest response mismatch".to_string()))
                }
            }
            Credential::Trusted { username } => {
                let record = self.user(username)?;
                Ok(Self::identity(username, record))
            }
            Credential::Certificate { username, der } => {
                let record = self.user(username)?;

                match &record.certificate {
                    Some(registered) if registered == der => Ok(Self::identity(username, record)),
                    _ => {
                        debug!(username, "Certificate mismatch");
                        Err(Error::InvalidCredential("certificate mismatch".to_string()))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::PasswordHasher;

    use super::*;
    use crate::credential::DigestCredential;

    fn password_credential(username: &str, password: &str) -> Credential {
        Credential::UsernamePassword {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_plaintext_password_validation() {
        let mut backend = MemoryBackend::new();
        backend.add_user("aladdin", "Open Sesame", ["Customer"]);

        let identity = backend
            .validate(&password_credential("aladdin", "Open Sesame"))
            .await
            .unwrap();
        assert_eq!(identity.username(), "aladdin");
        assert!(identity.has_role("Customer"));

        let result = backend
            .validate(&password_credential("aladdin", "Bad sesame"))
            .await;
        assert!(matches!(result, Err(Error::InvalidCredential(_))));
    }

    #[tokio::test]
    async fn test_hashed_password_validation() {
        let salt = SaltString::generate(OsRng);
        let hash = Argon2::default()
            .hash_password(b"testpass", &salt)
            .unwrap()
            .to_string();

        let mut backend = MemoryBackend::new();
        backend
            .add_user_hashed("jduke", &hash, ["Manager"])
            .unwrap();

        let identity = backend
            .validate(&password_credential("jduke", "testpass"))
            .await
            .unwrap();
        assert_eq!(identity.username(), "jduke");

        let result = backend
            .validate(&password_credential("jduke", "wrongpass"))
            .await;
        assert!(matches!(result, Err(Error::InvalidCredential(_))));
    }

    #[test]
    fn test_add_user_hashed_rejects_garbage() {
        let mut backend = MemoryBackend::new();

        let result = backend.add_user_hashed("jduke", "not-a-hash", ["Manager"]);
        assert!(matches!(result, Err(Error::Initialization(_))));
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let backend = MemoryBackend::new();

        let result = backend
            .validate(&password_credential("nobody", "anything"))
            .await;
        assert!(matches!(result, Err(Error::InvalidCredential(_))));
    }

    #[tokio::test]
    async fn test_digest_validation_rfc_vector() {
        let mut backend = MemoryBackend::new();
        backend.add_user("Mufasa", "Circle Of Life", Vec::<String>::new());

        let mut submitted = DigestCredential {
            username: "Mufasa".to_string(),
            realm: "testrealm@host.com".to_string(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            uri: "/dir/index.html".to_string(),
            response: "6629fae49393a05397450978507c4ef1".to_string(),
            method: "GET".to_string(),
            qop: Some("auth".to_string()),
            nc: Some("00000001".to_string()),
            cnonce: Some("0a4f113b".to_string()),
            opaque: None,
        };

        let identity = backend
            .validate(&Credential::Digest(submitted.clone()))
            .await
            .unwrap();
        assert_eq!(identity.username(), "Mufasa");

        submitted.response = "0123456789abcdef0123456789abcdef".to_string();
        let result = backend.validate(&Credential::Digest(submitted)).await;
        assert!(matches!(result, Err(Error::InvalidCredential(_))));
    }

    #[tokio::test]
    async fn test_digest_needs_recoverable_secret() {
        let salt = SaltString::generate(OsRng);
        let hash = Argon2::default()
            .hash_password(b"Circle Of Life", &salt)
            .unwrap()
            .to_string();

        let mut backend = MemoryBackend::new();
        backend
            .add_user_hashed("Mufasa", &hash, Vec::<String>::new())
            .unwrap();

        let submitted = DigestCredential {
            username: "Mufasa".to_string(),
            ..DigestCredential::default()
        };

        let result = backend.validate(&Credential::Digest(submitted)).await;
        assert!(matches!(result, Err(Error::InvalidCredential(_))));
    }

    #[tokio::test]
    async fn test_trusted_credential_resolves_without_secret() {
        let mut backend = MemoryBackend::new();
        backend.add_trusted_user("jduke", ["Manager"]);

        let identity = backend
            .validate(&Credential::Trusted {
                username: "jduke".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(identity.username(), "jduke");
        assert!(identity.has_role("Manager"));
    }

    #[tokio::test]
    async fn test_certificate_validation() {
        let mut backend = MemoryBackend::new();
        backend.add_certificate("CN=jduke, O=Acme", vec![1, 2, 3], ["Manager"]);

        let identity = backend
            .validate(&Credential::Certificate {
                username: "CN=jduke, O=Acme".to_string(),
                der: vec![1, 2, 3],
            })
            .await
            .unwrap();
        assert_eq!(identity.username(), "CN=jduke, O=Acme");

        let result = backend
            .validate(&Credential::Certificate {
                username: "CN=jduke, O=Acme".to_string(),
                der: vec![9, 9, 9],
            })
            .await;
        assert!(matches!(result, Err(Error::InvalidCredential(_))));
    }
}
