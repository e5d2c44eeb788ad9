use serde::Deserialize;

use crate::errors::{DataError, Result};

pub const API_BASE_URL_VAR: &str = "PORTAL_API_BASE_URL";
pub const AUTH_TOKEN_VAR: &str = "PORTAL_AUTH_TOKEN";
pub const MEDIA_BASE_URL_VAR: &str = "PORTAL_MEDIA_BASE_URL";

const DEFAULT_USER_AGENT: &str = concat!("dashstore/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize, Debug, Clone)]
pub struct PortalConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Base used to resolve relative media paths. Falls back to `api_base_url`.
    #[serde(default)]
    pub media_base_url: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl PortalConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            auth_token: None,
            media_base_url: None,
            user_agent: default_user_agent(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|value| !value.trim().is_empty());
        self
    }

    /// Loads `.env` (if present) and reads the `PORTAL_*` variables.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_base_url = non_empty(API_BASE_URL_VAR)
            .ok_or_else(|| DataError::Config(format!("{API_BASE_URL_VAR} is not set")))?;

        Ok(Self {
            api_base_url,
            auth_token: non_empty(AUTH_TOKEN_VAR),
            media_base_url: non_empty(MEDIA_BASE_URL_VAR),
            user_agent: default_user_agent(),
        })
    }

    pub fn media_base(&self) -> &str {
        self.media_base_url.as_deref().unwrap_or(&self.api_base_url)
    }
}
