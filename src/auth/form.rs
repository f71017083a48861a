use super::{AuthScheme, ResponseAction};
use crate::configuration::FormConfig;
use crate::credential::Credential;
use crate::error::Error;
use crate::request::AuthContext;

/// URI marker identifying a form login submission.
pub const SECURITY_CHECK_MARKER: &str = "j_security_check";

pub const USERNAME_PARAMETER: &str = "j_username";
pub const PASSWORD_PARAMETER: &str = "j_password";

/// Form-based authentication: unauthenticated requests are forwarded to a
/// login page, submissions arrive on the `j_security_check` endpoint, and
/// rejected credentials redirect to an error page.
pub struct FormScheme {
    login_page: String,
    error_page: String,
}

impl FormScheme {
    pub fn new(config: &FormConfig) -> Self {
        FormScheme {
            login_page: config.login_page.clone(),
            error_page: config.error_page.clone(),
        }
    }
}

impl AuthScheme for FormScheme {
    fn name(&self) -> &'static str {
        "form"
    }

    fn is_credential_request(&self, ctx: &AuthContext) -> bool {
        ctx.request_uri().contains(SECURITY_CHECK_MARKER)
    }

    fn extract_credential(&self, ctx: &AuthContext) -> Result<Credential, Error> {
        let username = ctx.parameter(USERNAME_PARAMETER).ok_or_else(|| {
            Error::MalformedCredential(format!("missing '{USERNAME_PARAMETER}' parameter"))
        })?;
        let password = ctx.parameter(PASSWORD_PARAMETER).ok_or_else(|| {
            Error::MalformedCredential(format!("missing '{PASSWORD_PARAMETER}' parameter"))
        })?;

        Ok(Credential::UsernamePassword {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn challenge(&self, _ctx: &AuthContext) -> Result<ResponseAction, Error> {
        Ok(ResponseAction::Forward(self.login_page.clone()))
    }

    fn on_invalid_credentials(&self, ctx: &AuthContext) -> Result<ResponseAction, Error> {
        Ok(ResponseAction::Redirect(format!(
            "{}{}",
            ctx.context_path(),
            self.error_page
        )))
    }
}
