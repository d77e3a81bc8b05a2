//! Request descriptors delivered with fetch events.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::hash::compute_cache_key;
use crate::url::{canonicalize, resolve};

/// What the page intends to do with the response.
///
/// Mirrors the `Request.destination` values the routing table cares about.
/// Anything else collapses into `Empty` (fetch/XHR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Font,
    Image,
    Worker,
    Manifest,
    Empty,
}

impl Destination {
    /// Destinations served stale-while-revalidate by the default table.
    pub const STATIC: &'static [Destination] = &[
        Destination::Script,
        Destination::Style,
        Destination::Font,
        Destination::Image,
        Destination::Worker,
        Destination::Manifest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Image => "image",
            Destination::Worker => "worker",
            Destination::Manifest => "manifest",
            Destination::Empty => "empty",
        }
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "font" => Ok(Destination::Font),
            "image" => Ok(Destination::Image),
            "worker" | "sharedworker" | "serviceworker" => Ok(Destination::Worker),
            "manifest" => Ok(Destination::Manifest),
            "" | "empty" => Ok(Destination::Empty),
            other => Err(Error::InvalidInput(format!("unknown destination: {other}"))),
        }
    }
}

/// Request mode, as in `Request.mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// HTTP cache interaction, as in `Request.cache`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    #[default]
    Default,
    /// Bypass any intermediate HTTP cache and revalidate at the origin.
    Reload,
}

/// Identity of a cache entry: method plus canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.to_string() }
    }

    pub fn get(url: &Url) -> Self {
        Self::new("GET", url)
    }

    /// SHA-256 digest used as the storage key.
    pub fn hash(&self) -> String {
        compute_cache_key(&self.method, &self.url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A request as seen by the fetch handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub url: Url,
    pub method: String,
    pub destination: Destination,
    pub mode: RequestMode,
    pub cache: CacheMode,
}

impl RequestDescriptor {
    /// A plain `GET` subresource request for an absolute URL.
    pub fn get(url: &str) -> Result<Self, Error> {
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            url,
            method: "GET".into(),
            destination: Destination::Empty,
            mode: RequestMode::Cors,
            cache: CacheMode::Default,
        })
    }

    /// A request for `input` resolved against the application origin.
    pub fn resolve(origin: &Url, input: &str) -> Result<Self, Error> {
        let url = resolve(origin, input).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            url,
            method: "GET".into(),
            destination: Destination::Empty,
            mode: RequestMode::Cors,
            cache: CacheMode::Default,
        })
    }

    /// A full-page navigation.
    pub fn navigate(origin: &Url, input: &str) -> Result<Self, Error> {
        Ok(Self::resolve(origin, input)?
            .with_destination(Destination::Document)
            .with_mode(RequestMode::Navigate))
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}
