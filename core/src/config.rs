//! Client configuration.
//!
//! `ClientConfig` can be built in code or deserialized from JSON. The OAuth
//! bundle is a single optional struct with four required fields, so a
//! half-filled `oauth` object is rejected by serde before it reaches the
//! client; `validate` rejects the empty-string cases serde cannot see.

use serde::{Deserialize, Serialize};

use crate::error::EventfulError;

/// Root of the public Eventful API.
pub const DEFAULT_API_ROOT: &str = "http://api.eventful.com";

/// User agent sent with OAuth-signed requests.
pub const DEFAULT_USER_AGENT: &str = concat!("eventful-rust/", env!("CARGO_PKG_VERSION"));

/// Consumer and access-token pair used for OAuth1 signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl OAuthCredentials {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }

    /// Every field must be non-empty; a partial bundle is a misuse.
    pub fn validate(&self) -> Result<(), EventfulError> {
        let fields = [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("access_token", &self.access_token),
            ("access_token_secret", &self.access_token_secret),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(EventfulError::Configuration(format!(
                    "OAuth credential `{name}` must not be empty"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub app_key: String,
    #[serde(default = "default_api_root")]
    pub api_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthCredentials>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_root() -> String {
    DEFAULT_API_ROOT.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ClientConfig {
    pub fn new(app_key: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            api_root: default_api_root(),
            oauth: None,
            user_agent: default_user_agent(),
        }
    }

    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into();
        self
    }

    pub fn with_oauth(mut self, oauth: OAuthCredentials) -> Self {
        self.oauth = Some(oauth);
        self
    }

    pub fn validate(&self) -> Result<(), EventfulError> {
        if self.app_key.trim().is_empty() {
            return Err(EventfulError::Configuration(
                "app key must not be empty".to_string(),
            ));
        }
        if let Some(oauth) = &self.oauth {
            oauth.validate()?;
        }
        Ok(())
    }
}
