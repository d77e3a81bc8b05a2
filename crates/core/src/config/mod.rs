//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::worker::policy::OpaquePolicy;
use crate::worker::routing::RouteConfig;

mod validation;

pub use validation::ConfigError;

/// Static assets seeded at install: the application shell, its sources and
/// icons, and the third-party scripts and fonts it loads.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "index.html",
    "manifest.json",
    "metadata.json",
    "index.tsx",
    "App.tsx",
    "types.ts",
    "constants.ts",
    "components/icons.tsx",
    "components/StarRating.tsx",
    "components/ArtisanCard.tsx",
    "components/ArtisanProfileModal.tsx",
    "components/FilterPanel.tsx",
    "components/SplashScreen.tsx",
    "components/icon.svg",
    "maskable-icon.svg",
    "icons/icon-192x192.png",
    "icons/icon-512x512.png",
    "icons/maskable_icon.png",
    "https://cdn.tailwindcss.com",
    "https://fonts.googleapis.com/css2?family=Amiri:wght@400;700&family=Tajawal:wght@400;500;700&family=Cairo:wght@900&display=swap",
    "https://aistudiocdn.com/react@^19.2.0",
    "https://aistudiocdn.com/react-dom@^19.2.0/client",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the application is served from. Relative manifest entries and
    /// the offline fallback resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Bumped on every deploy; activation deletes generations with any other
    /// version.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Page served to navigations when the network is unreachable. Must be
    /// part of the manifest.
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Parallel manifest fetches during install.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,

    #[serde(default)]
    pub opaque_policy: OpaquePolicy,

    /// Request URL prefixes whose opaque responses are never cached.
    #[serde(default)]
    pub opaque_skip_prefixes: Vec<String>,

    #[serde(default = "default_max_opaque_entries")]
    pub max_opaque_entries: usize,

    /// Use navigation preload when the host supports it.
    #[serde(default = "default_true")]
    pub navigation_preload: bool,

    /// Activate a newly installed worker without waiting for open pages to
    /// close.
    #[serde(default)]
    pub skip_waiting: bool,

    /// Extra routing rules, evaluated before the built-in ones.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_cache_prefix() -> String {
    "artisan-connect-cache".into()
}

fn default_cache_version() -> String {
    "v9".into()
}

fn default_manifest() -> Vec<String> {
    DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect()
}

fn default_offline_fallback() -> String {
    "/index.html".into()
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    10
}

fn default_install_concurrency() -> usize {
    4
}

fn default_max_opaque_entries() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            manifest: default_manifest(),
            offline_fallback: default_offline_fallback(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            install_concurrency: default_install_concurrency(),
            opaque_policy: OpaquePolicy::default(),
            opaque_skip_prefixes: Vec::new(),
            max_opaque_entries: default_max_opaque_entries(),
            navigation_preload: true,
            skip_waiting: false,
            routes: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Tag of the cache generation this deployment owns.
    pub fn generation_tag(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
