use std::fs;
use std::path::Path;

use serde::Deserialize;

mod error;

pub use error::Error;

use crate::policy::ProtectedResource;

/// Top-level configuration, deserialized from TOML.
#[derive(Clone, Debug, Deserialize)]
pub struct Configuration {
    #[serde(default = "Configuration::default_realm")]
    pub realm: String,
    /// Landing page after login. Anything other than `/` overrides the
    /// originally requested URI.
    #[serde(default = "Configuration::default_default_page")]
    pub default_page: String,
    #[serde(default)]
    pub scheme: SchemeConfig,
    #[serde(default)]
    pub logout: LogoutConfig,
    /// Ordered protection rules; the first matching pattern wins.
    #[serde(default)]
    pub resources: Vec<ProtectedResource>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            realm: Configuration::default_realm(),
            default_page: Configuration::default_default_page(),
            scheme: SchemeConfig::default(),
            logout: LogoutConfig::default(),
            resources: Vec::new(),
        }
    }
}

impl Configuration {
    fn default_realm() -> String {
        "Protected Realm".to_string()
    }

    fn default_default_page() -> String {
        "/".to_string()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let config_str = fs::read_to_string(path)?;
        Self::load_from_str(&config_str)
    }

    pub fn load_from_str(slice: &str) -> Result<Self, Error> {
        let config: Configuration = toml::from_str(slice)?;
        Ok(config)
    }
}

/// Which wire protocol the controller speaks.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub enum SchemeConfig {
    #[default]
    #[serde(rename = "basic")]
    Basic,
    #[serde(rename = "digest")]
    Digest(DigestConfig),
    #[serde(rename = "form")]
    Form(FormConfig),
    #[serde(rename = "client_cert")]
    ClientCert(ClientCertConfig),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DigestConfig {
    /// Static opaque value echoed by clients; generated when absent.
    #[serde(default)]
    pub opaque: Option<String>,
    #[serde(default = "DigestConfig::default_nonce_max_age_ms")]
    pub nonce_max_age_ms: u64,
    /// Protection-space URIs advertised in the challenge; defaults to the
    /// request's context path.
    #[serde(default)]
    pub domain: Option<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        DigestConfig {
            opaque: None,
            nonce_max_age_ms: DigestConfig::default_nonce_max_age_ms(),
            domain: None,
        }
    }
}

impl DigestConfig {
    fn default_nonce_max_age_ms() -> u64 {
        180_000
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FormConfig {
    #[serde(default = "FormConfig::default_login_page")]
    pub login_page: String,
    #[serde(default = "FormConfig::default_error_page")]
    pub error_page: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        FormConfig {
            login_page: FormConfig::default_login_page(),
            error_page: FormConfig::default_error_page(),
        }
    }
}

impl FormConfig {
    fn default_login_page() -> String {
        "/login.jsp".to_string()
    }

    fn default_error_page() -> String {
        "/error.jsp".to_string()
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ClientCertConfig {
    /// Use the certificate subject's CN as the principal name, trusting the
    /// transport's validation of the certificate itself.
    #[serde(default = "ClientCertConfig::default_use_cn_as_principal")]
    pub use_cn_as_principal: bool,
    /// Validate the certificate against the identity backend instead.
    #[serde(default)]
    pub use_certificate_validation: bool,
}

impl Default for ClientCertConfig {
    fn default() -> Self {
        ClientCertConfig {
            use_cn_as_principal: ClientCertConfig::default_use_cn_as_principal(),
            use_certificate_validation: false,
        }
    }
}

impl ClientCertConfig {
    fn default_use_cn_as_principal() -> bool {
        true
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LogoutConfig {
    /// URI marker identifying a logout request.
    #[serde(default = "LogoutConfig::default_marker")]
    pub marker: String,
    /// Redirect target after logout; defaults to the context path.
    #[serde(default)]
    pub page: Option<String>,
}

impl Default for LogoutConfig {
    fn default() -> Self {
        LogoutConfig {
            marker: LogoutConfig::default_marker(),
            page: None,
        }
    }
}

impl LogoutConfig {
    fn default_marker() -> String {
        "logout".to_string()
    }
}
