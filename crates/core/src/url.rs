//! URL canonicalization for consistent cache keys and same-origin checks.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an absolute URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    normalize(parsed)
}

/// Resolve a possibly-relative reference against the application origin.
///
/// `"index.html"`, `"/index.html"` and `"./index.html"` all land on the
/// origin root; absolute `http(s)` references are kept as-is (after
/// normalization). This is how manifest entries such as `"icons/icon.png"`
/// and `"https://cdn.tailwindcss.com"` end up in one key space.
pub fn resolve(base: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let root = base.join("/").map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    let joined = root.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    normalize(joined)
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &url::Url, b: &url::Url) -> bool {
    a.origin() == b.origin()
}

fn normalize(mut parsed: url::Url) -> Result<url::Url, UrlError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("http://localhost:3000").unwrap()
    }

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("example.com").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://CDN.TailwindCSS.com").unwrap();
        assert_eq!(url.host_str(), Some("cdn.tailwindcss.com"));
    }

    #[test]
    fn test_canonicalize_remove_fragment_keep_query() {
        let url = canonicalize("https://fonts.googleapis.com/css2?family=Amiri&display=swap#x").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("family=Amiri&display=swap"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_whitespace_only() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_relative_entries_share_root() {
        let a = resolve(&origin(), "index.html").unwrap();
        let b = resolve(&origin(), "/index.html").unwrap();
        let c = resolve(&origin(), "./index.html").unwrap();
        assert_eq!(a.as_str(), "http://localhost:3000/index.html");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_resolve_ignores_base_path() {
        let base = url::Url::parse("http://localhost:3000/admin/panel").unwrap();
        let url = resolve(&base, "components/icon.svg").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/components/icon.svg");
    }

    #[test]
    fn test_resolve_keeps_absolute() {
        let url = resolve(&origin(), "https://aistudiocdn.com/react@^19.2.0").unwrap();
        assert_eq!(url.host_str(), Some("aistudiocdn.com"));
    }

    #[test]
    fn test_same_origin() {
        let app = resolve(&origin(), "/app.js").unwrap();
        let cdn = canonicalize("https://cdn.tailwindcss.com").unwrap();
        assert!(same_origin(&origin(), &app));
        assert!(!same_origin(&origin(), &cdn));
    }
}
