//! Which responses may be written to the runtime cache.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::request::RequestDescriptor;
use crate::response::{CapturedResponse, ResponseKind};

/// Treatment of opaque (status 0) cross-origin responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OpaquePolicy {
    /// Store them; their success cannot be verified, so the count is capped.
    #[default]
    Cache,
    /// Never store them.
    Skip,
}

/// Why a response was not cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Method,
    Redirect,
    Status(u16),
    Opaque,
    NetworkError,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Method => f.write_str("non-GET request"),
            SkipReason::Redirect => f.write_str("redirected response"),
            SkipReason::Status(status) => write!(f, "status {status}"),
            SkipReason::Opaque => f.write_str("opaque response not allowed"),
            SkipReason::NetworkError => f.write_str("network error response"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Store,
    Skip(SkipReason),
}

#[derive(Debug, Clone, Default)]
pub struct CachePolicy {
    pub opaque: OpaquePolicy,
    /// Request URL prefixes whose opaque responses are never stored.
    pub opaque_skip_prefixes: Vec<String>,
}

impl CachePolicy {
    pub fn new(opaque: OpaquePolicy, opaque_skip_prefixes: Vec<String>) -> Self {
        Self { opaque, opaque_skip_prefixes }
    }

    pub fn verdict(&self, request: &RequestDescriptor, response: &CapturedResponse) -> Verdict {
        if !request.method.eq_ignore_ascii_case("GET") {
            return Verdict::Skip(SkipReason::Method);
        }

        match response.kind {
            ResponseKind::Error => Verdict::Skip(SkipReason::NetworkError),
            ResponseKind::Opaque => {
                let skipped = self.opaque == OpaquePolicy::Skip
                    || self
                        .opaque_skip_prefixes
                        .iter()
                        .any(|prefix| request.url.as_str().starts_with(prefix.as_str()));
                if skipped { Verdict::Skip(SkipReason::Opaque) } else { Verdict::Store }
            }
            ResponseKind::Basic | ResponseKind::Cors => {
                if response.redirected || (300..400).contains(&response.status) {
                    Verdict::Skip(SkipReason::Redirect)
                } else if response.status != 200 {
                    Verdict::Skip(SkipReason::Status(response.status))
                } else {
                    Verdict::Store
                }
            }
        }
    }
}
