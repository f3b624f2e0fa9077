//! Client credentials.

use crate::error::ConfigError;
use std::env;

/// Credentials for the Pingdom API.
///
/// The application key is mandatory. Username and password enable HTTP
/// basic auth; `account_email` targets a sub-account on multi-user plans.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub key: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub account_email: Option<String>,
}

impl Credentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            username: None,
            password: None,
            account_email: None,
        }
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_account_email(mut self, email: impl Into<String>) -> Self {
        self.account_email = Some(email.into());
        self
    }

    /// Read credentials from the environment: `PINGDOM_APP_KEY` (required),
    /// `PINGDOM_USERNAME`, `PINGDOM_PASSWORD`, `PINGDOM_ACCOUNT_EMAIL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let key = env::var("PINGDOM_APP_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::new("an application key must be provided (set PINGDOM_APP_KEY)")
            })?;
        let mut credentials = Credentials::new(key);
        if let (Ok(username), Ok(password)) =
            (env::var("PINGDOM_USERNAME"), env::var("PINGDOM_PASSWORD"))
        {
            credentials = credentials.with_basic_auth(username, password);
        }
        if let Ok(email) = env::var("PINGDOM_ACCOUNT_EMAIL") {
            credentials = credentials.with_account_email(email);
        }
        Ok(credentials)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.key.trim().is_empty() {
            return Err(ConfigError::new("an application key must be provided"));
        }
        Ok(())
    }
}
