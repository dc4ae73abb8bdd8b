//! Process-wide adapter configuration
//!
//! The configuration is read once at startup and never mutated afterwards. It is
//! shared as an `Arc<AdoConfig>` between the dispatcher and the executor.
//!
//! # Environment
//!
//! | variable | default |
//! |---|---|
//! | `AZURE_DEVOPS_ORG` | `YourOrganization` |
//! | `AZURE_DEVOPS_PROJECT` | `YourProject` |
//! | `AZURE_DEVOPS_WIKI` | `<project>.wiki` |
//! | `AZURE_DEVOPS_PAT` | required |
//! | `AZURE_DEVOPS_BASE_URL` | `https://dev.azure.com` |

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{Error, Result};

pub const ENV_ORGANIZATION: &str = "AZURE_DEVOPS_ORG";
pub const ENV_PROJECT: &str = "AZURE_DEVOPS_PROJECT";
pub const ENV_WIKI: &str = "AZURE_DEVOPS_WIKI";
pub const ENV_CREDENTIAL: &str = "AZURE_DEVOPS_PAT";
pub const ENV_BASE_URL: &str = "AZURE_DEVOPS_BASE_URL";

pub const DEFAULT_ORGANIZATION: &str = "YourOrganization";
pub const DEFAULT_PROJECT: &str = "YourProject";
pub const DEFAULT_BASE_URL: &str = "https://dev.azure.com";

/// Protocol version sent with every request as `api-version`
pub const API_VERSION: &str = "7.1";

/// Immutable adapter configuration
#[derive(Clone)]
pub struct AdoConfig {
    organization: String,
    project: String,
    wiki: String,
    credential: String,
    base_url: String,
    auth_header: String,
}

impl AdoConfig {
    /// Build a configuration, rejecting an empty credential.
    ///
    /// `wiki` defaults to `<project>.wiki` when `None`.
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        wiki: Option<String>,
        credential: impl Into<String>,
    ) -> Result<Self> {
        let organization = organization.into();
        let project = project.into();
        let credential = credential.into();

        if credential.trim().is_empty() {
            return Err(Error::Config(format!(
                "{ENV_CREDENTIAL} environment variable is required"
            )));
        }
        if organization.trim().is_empty() {
            return Err(Error::Config("organization must not be empty".to_string()));
        }
        if project.trim().is_empty() {
            return Err(Error::Config("project must not be empty".to_string()));
        }

        let wiki = wiki
            .filter(|w| !w.trim().is_empty())
            .unwrap_or_else(|| format!("{project}.wiki"));
        let auth_header = format!("Basic {}", STANDARD.encode(format!(":{credential}")));

        Ok(Self {
            organization,
            project,
            wiki,
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_header,
        })
    }

    /// Point the adapter at a different service root (on-prem servers, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let organization = non_empty(ENV_ORGANIZATION).unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string());
        let project = non_empty(ENV_PROJECT).unwrap_or_else(|| DEFAULT_PROJECT.to_string());
        let credential = non_empty(ENV_CREDENTIAL).ok_or_else(|| {
            Error::Config(format!("{ENV_CREDENTIAL} environment variable is required"))
        })?;

        let config = Self::new(organization, project, non_empty(ENV_WIKI), credential)?;
        Ok(match non_empty(ENV_BASE_URL) {
            Some(base_url) => config.with_base_url(base_url),
            None => config,
        })
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Default project used when an invocation does not name one
    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn wiki(&self) -> &str {
        &self.wiki
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> &'static str {
        API_VERSION
    }

    /// Constant `Authorization` header value derived from the credential
    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    /// `<base>/<org>/<project>/_apis`
    pub fn api_root(&self, project: &str) -> String {
        format!("{}/{}/{}/_apis", self.base_url, self.organization, project)
    }

    /// Page where a new personal access token can be generated
    pub fn token_settings_url(&self) -> String {
        format!("{}/{}/_usersSettings/tokens", self.base_url, self.organization)
    }
}

impl fmt::Debug for AdoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdoConfig")
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("wiki", &self.wiki)
            .field("base_url", &self.base_url)
            .field("credential", &format_args!("<{} chars>", self.credential.len()))
            .finish()
    }
}
