pub mod memory;

pub use memory::MemoryBackend;

use async_trait::async_trait;

use crate::credential::Credential;
use crate::error::Error;
use crate::identity::Identity;

/// Identity backend consulted to validate extracted credentials.
///
/// Implementations resolve the credential's principal and verify its secret
/// (or, for [`Credential::Trusted`], accept it outright), returning the
/// populated [`Identity`]. Rejections surface as
/// [`Error::InvalidCredential`]; infrastructure failures as
/// [`Error::BackendUnavailable`], which the controller never retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    async fn validate(&self, credential: &Credential) -> Result<Identity, Error>;
}
