use crate::errors::{SynapseError, SynapseResult};
use std::{env, time::Duration};

/// Environment variable overriding the backend base URL.
pub const BASE_URL_ENV: &str = "SYNAPSE_API_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// How long a finished progress bar stays at its final value before decaying
/// back to 0.
pub const DEFAULT_PROGRESS_RESET_DELAY: Duration = Duration::from_millis(1000);

/// Pause between two files of a multi-file upload.
pub const DEFAULT_UPLOAD_PACING: Duration = Duration::from_millis(500);

/// Backend routes consumed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Health,
    Query,
    Upload,
    SyncSlack,
    SyncGitHub,
    SyncCancel,
}

impl Endpoint {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Health => "/",
            Self::Query => "/api/query",
            Self::Upload => "/api/upload",
            Self::SyncSlack => "/api/sync/slack",
            Self::SyncGitHub => "/api/sync/github",
            Self::SyncCancel => "/api/sync/cancel",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub base_url: String,
    pub progress_reset_delay: Duration,
    pub upload_pacing: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            progress_reset_delay: DEFAULT_PROGRESS_RESET_DELAY,
            upload_pacing: DEFAULT_UPLOAD_PACING,
        }
    }
}

impl ClientConfig {
    /// Resolve the configuration from the environment.
    ///
    /// Optional environment variables:
    /// - `SYNAPSE_API_URL` - backend base URL (default: http://localhost:8000)
    ///
    /// # Errors
    /// Returns [`SynapseError::Config`] when the override is not an http(s) URL.
    pub fn from_env() -> SynapseResult<Self> {
        let config = Self::default();
        match env::var(BASE_URL_ENV) {
            Ok(value) if !value.trim().is_empty() => config.with_base_url(value),
            _ => Ok(config),
        }
    }

    /// # Errors
    /// Returns [`SynapseError::Config`] when `base_url` is not an http(s) URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> SynapseResult<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(SynapseError::Config(format!(
                "base url must start with http:// or https://, got `{base_url}`"
            )));
        }
        self.base_url = trimmed.to_string();
        Ok(self)
    }

    #[must_use]
    pub fn with_progress_reset_delay(mut self, delay: Duration) -> Self {
        self.progress_reset_delay = delay;
        self
    }

    #[must_use]
    pub fn with_upload_pacing(mut self, pacing: Duration) -> Self {
        self.upload_pacing = pacing;
        self
    }

    #[must_use]
    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let config = ClientConfig::default()
            .with_base_url("http://synapse.internal:9000/")
            .unwrap();
        assert_eq!(
            config.url(Endpoint::Query),
            "http://synapse.internal:9000/api/query"
        );
        assert_eq!(config.url(Endpoint::Health), "http://synapse.internal:9000/");
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = ClientConfig::default()
            .with_base_url("localhost:8000")
            .unwrap_err();
        assert!(matches!(err, SynapseError::Config(_)));
    }

    #[test]
    fn default_points_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.url(Endpoint::SyncCancel), "http://localhost:8000/api/sync/cancel");
    }
}
