//! Captured responses: what the network hands back and what the store keeps.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Response type, as in `Response.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin, fully inspectable.
    Basic,
    /// Cross-origin with permissive CORS headers, inspectable.
    Cors,
    /// Cross-origin `no-cors`; status reads as 0 and headers are hidden.
    Opaque,
    /// Synthesized network error.
    Error,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
            ResponseKind::Error => "error",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseKind::Basic),
            "cors" => Ok(ResponseKind::Cors),
            "opaque" => Ok(ResponseKind::Opaque),
            "error" => Ok(ResponseKind::Error),
            other => Err(Error::InvalidInput(format!("unknown response kind: {other}"))),
        }
    }
}

/// A fully buffered response.
///
/// The body is reference counted, so `clone()` is how a handler gets the
/// second copy it needs when it both stores and returns a response. Store
/// writes take the response by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub kind: ResponseKind,
    /// Whether the network followed at least one redirect.
    pub redirected: bool,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CapturedResponse {
    /// A 200 `basic` response, mostly for hosts and tests.
    pub fn ok(url: &str, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.to_string(),
            status: 200,
            status_text: "OK".into(),
            kind: ResponseKind::Basic,
            redirected: false,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// An opaque cross-origin response. Status and headers are not visible.
    pub fn opaque(url: &str, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.to_string(),
            status: 0,
            status_text: String::new(),
            kind: ResponseKind::Opaque,
            redirected: false,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16, status_text: &str) -> Self {
        self.status = status;
        self.status_text = status_text.to_string();
        self
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn redirected(mut self) -> Self {
        self.redirected = true;
        self
    }

    /// `Response.ok`: status in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_opaque(&self) -> bool {
        self.kind == ResponseKind::Opaque
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub(crate) fn headers_json(&self) -> Result<String, Error> {
        serde_json::to_string(&self.headers).map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))
    }

    pub(crate) fn headers_from_json(json: &str) -> Vec<(String, String)> {
        serde_json::from_str(json).unwrap_or_default()
    }
}
