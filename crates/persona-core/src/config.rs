//! Pipeline configuration
//!
//! Loaded from a YAML file (`config.yaml` by default), then optionally
//! overridden from `PERSONA_*` environment variables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PersonaError;
use crate::Result;

/// Default number of refinement attempts before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Default number of photos sampled per identity
pub const DEFAULT_PHOTO_SAMPLE_SIZE: usize = 4;

/// Default number of candidates requested per search
pub const DEFAULT_SEARCH_COUNT: u32 = 1000;

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Persona pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Base URL of the people-search API
    pub api_url: String,
    /// Forwarding proxy for every request (optional)
    #[serde(default)]
    pub proxy: Option<String>,
    /// Query parameters sent with every API call (access token, API version)
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Root directory for downloaded photos
    #[serde(default = "default_photo_root")]
    pub photo_root: PathBuf,
    /// Refinement attempt ceiling
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound on photos sampled per identity
    #[serde(default = "default_photo_sample_size")]
    pub photo_sample_size: usize,
    /// Candidates requested per search
    #[serde(default = "default_search_count")]
    pub search_count: u32,
    /// User agent for API and photo requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_photo_root() -> PathBuf {
    PathBuf::from("photos")
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_photo_sample_size() -> usize {
    DEFAULT_PHOTO_SAMPLE_SIZE
}

fn default_search_count() -> u32 {
    DEFAULT_SEARCH_COUNT
}

fn default_user_agent() -> String {
    format!("persona-forge/{}", crate::VERSION)
}

impl PersonaConfig {
    /// Create config for a specific API endpoint with defaults elsewhere
    pub fn new(api_url: &str) -> Self {
        PersonaConfig {
            api_url: api_url.to_string(),
            proxy: None,
            params: BTreeMap::new(),
            photo_root: default_photo_root(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            photo_sample_size: DEFAULT_PHOTO_SAMPLE_SIZE,
            search_count: DEFAULT_SEARCH_COUNT,
            user_agent: default_user_agent(),
        }
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PersonaConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PersonaError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loaded persona config");
        Self::from_yaml_str(&content)
    }

    /// Apply `PERSONA_*` environment overrides on top of file values
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `PERSONA_*` overrides read through `lookup`.
    ///
    /// An empty `PERSONA_PROXY` clears the proxy from the file.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PERSONA_API_URL") {
            self.api_url = url;
        }
        if let Some(proxy) = lookup("PERSONA_PROXY") {
            self.proxy = if proxy.is_empty() { None } else { Some(proxy) };
        }
        if let Some(token) = lookup("PERSONA_ACCESS_TOKEN") {
            self.params.insert("access_token".to_string(), token);
        }
        if let Some(root) = lookup("PERSONA_PHOTO_ROOT") {
            self.photo_root = PathBuf::from(root);
        }
        self.validate()?;
        Ok(self)
    }

    /// Set the forwarding proxy
    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    /// Set the photo root directory
    pub fn with_photo_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.photo_root = root.into();
        self
    }

    /// Set the refinement attempt ceiling
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Add a default query parameter
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(PersonaError::Config("api_url must not be empty".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(PersonaError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.photo_sample_size == 0 {
            return Err(PersonaError::Config(
                "photo_sample_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
