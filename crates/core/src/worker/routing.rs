//! Routing table: request predicate → caching strategy.
//!
//! Rules are evaluated in order and the first match wins. The table is
//! built once per worker and shared read-only between fetch handlers.

use std::fmt;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::request::{Destination, RequestDescriptor};

/// How a matched request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Cache, then network (storing a clone of cacheable responses).
    CacheFirst,
    /// Network, then the offline page for navigations or the request's own
    /// cached entry otherwise.
    NetworkFirst,
    /// Cached entry now, refreshed in the background for next time.
    StaleWhileRevalidate,
    /// Network, then the offline page for any destination.
    NetworkOnlyWithFallback,
    /// Not intercepted.
    Passthrough,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
            Strategy::NetworkOnlyWithFallback => "network-only-with-fallback",
            Strategy::Passthrough => "passthrough",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate over a request.
#[derive(Debug, Clone)]
pub enum RequestMatcher {
    Any,
    Navigation,
    Destinations(Vec<Destination>),
    UrlPrefix(String),
    UrlPattern(Regex),
    Method(String),
    Not(Box<RequestMatcher>),
    All(Vec<RequestMatcher>),
}

impl RequestMatcher {
    pub fn matches(&self, request: &RequestDescriptor) -> bool {
        match self {
            RequestMatcher::Any => true,
            RequestMatcher::Navigation => request.is_navigation(),
            RequestMatcher::Destinations(list) => list.contains(&request.destination),
            RequestMatcher::UrlPrefix(prefix) => request.url.as_str().starts_with(prefix.as_str()),
            RequestMatcher::UrlPattern(re) => re.is_match(request.url.as_str()),
            RequestMatcher::Method(method) => request.method.eq_ignore_ascii_case(method),
            RequestMatcher::Not(inner) => !inner.matches(request),
            RequestMatcher::All(all) => all.iter().all(|m| m.matches(request)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub name: String,
    pub matcher: RequestMatcher,
    pub strategy: Strategy,
}

impl RoutingRule {
    pub fn new(name: &str, matcher: RequestMatcher, strategy: Strategy) -> Self {
        Self { name: name.to_string(), matcher, strategy }
    }
}

/// A user-supplied rule, as it appears in configuration.
///
/// Every predicate that is set must match; a rule with no predicates
/// matches everything.
///
/// ```toml
/// [[routes]]
/// name = "cdn-react"
/// url_prefix = "https://aistudiocdn.com/"
/// strategy = "stale-while-revalidate"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RouteConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub url_prefix: Option<String>,
    #[serde(default)]
    pub url_pattern: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub navigation: Option<bool>,
    pub strategy: Strategy,
}

impl TryFrom<&RouteConfig> for RoutingRule {
    type Error = Error;

    fn try_from(config: &RouteConfig) -> Result<Self, Self::Error> {
        let mut all = Vec::new();
        if !config.destinations.is_empty() {
            all.push(RequestMatcher::Destinations(config.destinations.clone()));
        }
        if let Some(prefix) = &config.url_prefix {
            all.push(RequestMatcher::UrlPrefix(prefix.clone()));
        }
        if let Some(pattern) = &config.url_pattern {
            let re = Regex::new(pattern)
                .map_err(|e| Error::InvalidInput(format!("invalid url_pattern {pattern:?}: {e}")))?;
            all.push(RequestMatcher::UrlPattern(re));
        }
        if let Some(method) = &config.method {
            all.push(RequestMatcher::Method(method.to_ascii_uppercase()));
        }
        match config.navigation {
            Some(true) => all.push(RequestMatcher::Navigation),
            Some(false) => all.push(RequestMatcher::Not(Box::new(RequestMatcher::Navigation))),
            None => {}
        }

        let matcher = match all.len() {
            0 => RequestMatcher::Any,
            1 => all.remove(0),
            _ => RequestMatcher::All(all),
        };
        let name = config.name.clone().unwrap_or_else(|| format!("custom-{}", config.strategy));

        Ok(RoutingRule { name, matcher, strategy: config.strategy })
    }
}

/// Ordered rule list.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    rules: Vec<RoutingRule>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RoutingTable {
    /// The built-in policy:
    ///
    /// 1. non-GET → passthrough
    /// 2. navigations → network-first (offline page on transport failure)
    /// 3. static destinations → stale-while-revalidate
    /// 4. everything else → cache-first
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                RoutingRule::new(
                    "non-get",
                    RequestMatcher::Not(Box::new(RequestMatcher::Method("GET".into()))),
                    Strategy::Passthrough,
                ),
                RoutingRule::new("navigation", RequestMatcher::Navigation, Strategy::NetworkFirst),
                RoutingRule::new(
                    "static-assets",
                    RequestMatcher::Destinations(Destination::STATIC.to_vec()),
                    Strategy::StaleWhileRevalidate,
                ),
                RoutingRule::new("default", RequestMatcher::Any, Strategy::CacheFirst),
            ],
        }
    }

    /// Built-in table with `custom` rules evaluated first.
    ///
    /// Custom rules cannot make non-GET requests cacheable; the non-GET
    /// passthrough stays in front.
    pub fn with_custom(custom: &[RouteConfig]) -> Result<Self, Error> {
        let mut table = Self::builtin();
        let mut rules = Vec::with_capacity(custom.len());
        for config in custom {
            rules.push(RoutingRule::try_from(config)?);
        }
        table.rules.splice(1..1, rules);
        Ok(table)
    }

    /// First rule matching `request`.
    pub fn route(&self, request: &RequestDescriptor) -> &RoutingRule {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(request))
            .unwrap_or_else(|| &self.rules[self.rules.len() - 1])
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }
}
