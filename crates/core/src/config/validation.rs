//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use thiserror::Error;
use url::Url;

use crate::config::AppConfig;
use crate::worker::manifest::AssetManifest;
use crate::worker::routing::RoutingTable;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` unless `origin` is an absolute http(s)
    /// URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(url),
            _ => Err(invalid("origin", "must be an http(s) URL with a host")),
        }
    }

    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent`, `cache_prefix` or `cache_version` is empty
    /// - `install_concurrency` is outside 1..=16
    /// - `origin` is not an http(s) URL
    /// - the manifest has duplicates or lacks the offline fallback
    /// - a route pattern does not compile
    ///
    /// Returns `ConfigError::Missing` if the manifest is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.cache_version.is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        if !(1..=16).contains(&self.install_concurrency) {
            return Err(invalid("install_concurrency", "must be between 1 and 16"));
        }

        let origin = self.origin_url()?;

        if self.manifest.is_empty() {
            return Err(ConfigError::Missing {
                field: "manifest".into(),
                hint: "list the application shell URLs to pre-cache".into(),
            });
        }
        let manifest = AssetManifest::resolve(&origin, &self.manifest).map_err(|e| invalid("manifest", e.to_string()))?;

        let fallback = crate::url::resolve(&origin, &self.offline_fallback)
            .map_err(|e| invalid("offline_fallback", e.to_string()))?;
        if !manifest.contains(&fallback) {
            return Err(invalid("offline_fallback", format!("{fallback} is not in the manifest")));
        }

        RoutingTable::with_custom(&self.routes).map_err(|e| invalid("routes", e.to_string()))?;

        if self.max_opaque_entries == 0 && self.opaque_policy == crate::worker::policy::OpaquePolicy::Cache {
            tracing::warn!("max_opaque_entries is 0; every cached opaque response will be purged immediately");
        }

        Ok(())
    }
}
