//! HTTP transport for the caching worker.
//!
//! ### Request semantics
//! - `cache: reload` sends `Cache-Control: no-cache` and `Pragma: no-cache`
//! - Redirects are followed (bounded); the response is flagged `redirected`
//! - HTTP error statuses are responses, not errors
//!
//! ### Response kinds
//! - same origin as the application → `basic`
//! - cross-origin in `no-cors` mode → `opaque` (status 0, no headers)
//! - other cross-origin → `cors`
//!
//! ### Limits
//! - Max body bytes: 5MB (configurable), enforced while streaming
//! - Request timeout: 20s (configurable)

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, Method, Response, header};
use url::Url;

use swcache_core::request::{CacheMode, RequestDescriptor, RequestMode};
use swcache_core::response::{CapturedResponse, ResponseKind};
use swcache_core::url::same_origin;
use swcache_core::{AppConfig, Error, Network};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 10)
    pub max_redirects: usize,

    /// Application origin; decides basic vs cross-origin responses.
    pub origin: Url,
}

impl FetchConfig {
    /// Derive the transport settings from application config.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the configured origin does not parse.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            origin,
        })
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, request: &RequestDescriptor, final_url: &Url) -> ResponseKind {
        if same_origin(final_url, &self.config.origin) {
            ResponseKind::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseKind::Opaque
        } else {
            ResponseKind::Cors
        }
    }

    async fn read_body(&self, mut response: Response) -> Result<Bytes, Error> {
        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(Error::FetchTooLarge(format!(
                    "body exceeds {} bytes",
                    self.config.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::FetchTimeout(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        if request.cache == CacheMode::Reload {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = builder.send().await.map_err(transport_error)?;

        let final_url = response.url().clone();
        let kind = self.classify(request, &final_url);
        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = self.read_body(response).await?;

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        if kind == ResponseKind::Opaque {
            return Ok(CapturedResponse::opaque(final_url.as_str(), body));
        }

        Ok(CapturedResponse {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            kind,
            redirected: final_url != request.url,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-route HTTP stub. Records raw request heads.
    async fn serve(response: &'static str) -> (Url, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                log.lock().unwrap().push(String::from_utf8_lossy(&buf[..n]).to_string());
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (Url::parse(&format!("http://{addr}/")).unwrap(), seen)
    }

    fn client(origin: &Url) -> FetchClient {
        FetchClient::new(FetchConfig {
            user_agent: "swcache-test".into(),
            max_bytes: 1024,
            timeout: Duration::from_millis(500),
            max_redirects: 3,
            origin: origin.clone(),
        })
        .unwrap()
    }

    const OK: &str = "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello";

    #[test]
    fn test_config_from_app_config() {
        let config = FetchConfig::from_app_config(&AppConfig::default()).unwrap();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20_000));
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.origin.as_str(), "http://localhost:3000/");
    }

    #[tokio::test]
    async fn test_same_origin_is_basic() {
        let (base, _) = serve(OK).await;
        let response = client(&base).fetch(&RequestDescriptor::get(base.as_str()).unwrap()).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.kind, ResponseKind::Basic);
        assert_eq!(response.body.as_ref(), b"hello");
        assert_eq!(response.content_type(), Some("text/html"));
        assert!(!response.redirected);
    }

    #[tokio::test]
    async fn test_reload_sends_no_cache_headers() {
        let (base, seen) = serve(OK).await;
        let request = RequestDescriptor::get(base.as_str()).unwrap().with_cache(CacheMode::Reload);
        client(&base).fetch(&request).await.unwrap();

        let head = seen.lock().unwrap()[0].to_ascii_lowercase();
        assert!(head.contains("cache-control: no-cache"));
        assert!(head.contains("pragma: no-cache"));
        assert!(head.contains("user-agent: swcache-test"));
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let (base, _) = serve("HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n").await;
        let response = client(&base).fetch(&RequestDescriptor::get(base.as_str()).unwrap()).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.status_text, "Not Found");
    }

    #[tokio::test]
    async fn test_cross_origin_kinds() {
        let (base, _) = serve(OK).await;
        let app = Url::parse("http://localhost:3000").unwrap();
        let http = client(&app);

        let cors = http.fetch(&RequestDescriptor::get(base.as_str()).unwrap()).await.unwrap();
        assert_eq!(cors.kind, ResponseKind::Cors);
        assert_eq!(cors.status, 200);

        let no_cors = RequestDescriptor::get(base.as_str()).unwrap().with_mode(RequestMode::NoCors);
        let opaque = http.fetch(&no_cors).await.unwrap();
        assert_eq!(opaque.kind, ResponseKind::Opaque);
        assert_eq!(opaque.status, 0);
        assert!(opaque.headers.is_empty());
    }

    #[tokio::test]
    async fn test_body_limit() {
        let (base, _) = serve("HTTP/1.1 200 OK\r\ncontent-length: 4096\r\nconnection: close\r\n\r\n").await;
        let result = client(&base).fetch(&RequestDescriptor::get(base.as_str()).unwrap()).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/");
        let result = client(&Url::parse(&url).unwrap()).fetch(&RequestDescriptor::get(&url).unwrap()).await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert!(err.is_network_failure());
    }

    #[tokio::test]
    async fn test_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let url = format!("http://{addr}/");
        let result = client(&Url::parse(&url).unwrap()).fetch(&RequestDescriptor::get(&url).unwrap()).await;
        assert!(matches!(result, Err(Error::FetchTimeout(_))));
    }

    #[tokio::test]
    async fn test_invalid_method() {
        let (base, _) = serve(OK).await;
        let request = RequestDescriptor::get(base.as_str()).unwrap().with_method("BAD METHOD");
        let result = client(&base).fetch(&request).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
