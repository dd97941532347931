use crate::constants::{ENV_ONVIF_PASSWORD, ENV_ONVIF_USERNAME, ENV_ZM_API_URL};
use crate::error::{Result, SyncError};
use std::fmt;
use url::Url;

/// Device-control username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"*".repeat(self.password.chars().count()))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// ZoneMinder API base, always ending in `/`.
    pub zm_url: Url,
    pub credentials: Credentials,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| {
                SyncError::ConfigurationError(format!("Please set {} environment variable", key))
            })
        };

        let mut zm_url = required(ENV_ZM_API_URL)?;
        if !zm_url.ends_with('/') {
            zm_url.push('/');
        }
        let zm_url = Url::parse(&zm_url).map_err(|e| {
            SyncError::ConfigurationError(format!("Invalid {} '{}': {}", ENV_ZM_API_URL, zm_url, e))
        })?;

        Ok(Self {
            zm_url,
            credentials: Credentials::new(required(ENV_ONVIF_USERNAME)?, required(ENV_ONVIF_PASSWORD)?),
        })
    }
}
