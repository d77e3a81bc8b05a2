//! Fetch interception.
//!
//! Per request: `RECEIVED → POLICY_MATCHED → {CACHE_LOOKUP, NETWORK_FETCH}
//! → RESPONDED`. The routing decision is synchronous; serving is async and
//! shares nothing with other in-flight requests except the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::policy::{CachePolicy, Verdict};
use super::routing::{RoutingTable, Strategy};
use crate::Error;
use crate::cache::CacheDb;
use crate::network::Network;
use crate::request::{RequestDescriptor, RequestKey};
use crate::response::CapturedResponse;

/// A fetch event as delivered by the host.
pub struct FetchEvent {
    pub request: RequestDescriptor,
    /// Navigation preload response racing worker startup. Resolves to
    /// `None` when the host had nothing preloaded.
    pub preload_response: Option<BoxFuture<'static, Option<CapturedResponse>>>,
}

impl FetchEvent {
    pub fn new(request: RequestDescriptor) -> Self {
        Self { request, preload_response: None }
    }

    pub fn with_preload(mut self, preload: BoxFuture<'static, Option<CapturedResponse>>) -> Self {
        self.preload_response = Some(preload);
        self
    }
}

/// Where the page's response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Cache,
    Network,
    Preload,
    OfflineFallback,
}

/// Synchronous routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDecision {
    Passthrough,
    Intercept { rule: String, strategy: Strategy },
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub response: CapturedResponse,
    pub source: ResponseSource,
    /// `None` when the request was passed through.
    pub strategy: Option<Strategy>,
    /// Background refresh started by stale-while-revalidate. Dropping the
    /// handle detaches the task; it still runs to completion.
    pub revalidation: Option<JoinHandle<()>>,
}

impl FetchOutcome {
    fn new(response: CapturedResponse, source: ResponseSource, strategy: Option<Strategy>) -> Self {
        Self { response, source, strategy, revalidation: None }
    }
}

/// Read/write access to one generation, shared with background tasks.
#[derive(Clone)]
struct RuntimeCache {
    store: CacheDb,
    generation: String,
    policy: Arc<CachePolicy>,
    max_opaque_entries: usize,
}

impl RuntimeCache {
    /// Cache read; failures degrade to a miss.
    async fn lookup(&self, key: &RequestKey) -> Option<CapturedResponse> {
        match self.store.get_entry(&self.generation, key).await {
            Ok(Some(entry)) => {
                tracing::debug!("cache hit for {}", key);
                Some(entry.response)
            }
            Ok(None) => {
                tracing::debug!("cache miss for {}", key);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Best-effort write. Returns whether the response was stored.
    async fn store(&self, request: &RequestDescriptor, response: CapturedResponse) -> bool {
        if let Verdict::Skip(reason) = self.policy.verdict(request, &response) {
            tracing::debug!(url = %request.url, %reason, "not caching response");
            return false;
        }

        let opaque = response.is_opaque();
        if let Err(e) = self.store.put_entry(&self.generation, &request.key(), response).await {
            tracing::warn!(error = %e, url = %request.url, generation = %self.generation, "cache write failed");
            return false;
        }

        if opaque {
            match self.store.purge_opaque(&self.generation, self.max_opaque_entries).await {
                Ok(0) => {}
                Ok(deleted) => tracing::debug!(deleted, generation = %self.generation, "capped opaque entries"),
                Err(e) => tracing::warn!(error = %e, "opaque cap failed"),
            }
        }
        true
    }
}

/// Serves fetch events for one worker version.
#[derive(Clone)]
pub struct FetchInterceptor {
    cache: RuntimeCache,
    network: Arc<dyn Network>,
    routes: Arc<RoutingTable>,
    offline_fallback: RequestKey,
    navigation_preload: Arc<AtomicBool>,
}

impl FetchInterceptor {
    pub fn new(
        store: CacheDb, network: Arc<dyn Network>, generation: &str, routes: Arc<RoutingTable>,
        policy: Arc<CachePolicy>, offline_fallback: RequestKey, max_opaque_entries: usize,
    ) -> Self {
        Self {
            cache: RuntimeCache { store, generation: generation.to_string(), policy, max_opaque_entries },
            network,
            routes,
            offline_fallback,
            navigation_preload: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn generation(&self) -> &str {
        &self.cache.generation
    }

    /// Turn use of navigation preload responses on or off.
    pub fn set_navigation_preload(&self, enabled: bool) {
        self.navigation_preload.store(enabled, Ordering::SeqCst);
    }

    pub fn navigation_preload(&self) -> bool {
        self.navigation_preload.load(Ordering::SeqCst)
    }

    /// Decide, without I/O, whether a request is intercepted.
    pub fn decide(&self, request: &RequestDescriptor) -> FetchDecision {
        let rule = self.routes.route(request);
        match rule.strategy {
            Strategy::Passthrough => FetchDecision::Passthrough,
            strategy => FetchDecision::Intercept { rule: rule.name.clone(), strategy },
        }
    }

    /// Produce the page's response.
    ///
    /// # Errors
    ///
    /// Network errors when neither the network nor any fallback can answer.
    pub async fn handle(&self, event: FetchEvent) -> Result<FetchOutcome, Error> {
        let strategy = match self.decide(&event.request) {
            FetchDecision::Passthrough => {
                let response = self.network.fetch(&event.request).await?;
                return Ok(FetchOutcome::new(response, ResponseSource::Network, None));
            }
            FetchDecision::Intercept { rule, strategy } => {
                tracing::debug!(url = %event.request.url, rule = %rule, %strategy, "intercepting fetch");
                strategy
            }
        };

        match strategy {
            Strategy::NetworkFirst => self.network_first(event).await,
            Strategy::NetworkOnlyWithFallback => self.network_only_with_fallback(event).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(event.request).await,
            Strategy::CacheFirst => self.cache_first(event.request).await,
            Strategy::Passthrough => {
                let response = self.network.fetch(&event.request).await?;
                Ok(FetchOutcome::new(response, ResponseSource::Network, None))
            }
        }
    }

    async fn preloaded(&self, event: &mut FetchEvent) -> Option<CapturedResponse> {
        let preload = event.preload_response.take()?;
        if !event.request.is_navigation() || !self.navigation_preload() {
            return None;
        }
        preload.await
    }

    async fn network_first(&self, mut event: FetchEvent) -> Result<FetchOutcome, Error> {
        let strategy = Some(Strategy::NetworkFirst);
        if let Some(response) = self.preloaded(&mut event).await {
            tracing::debug!(url = %event.request.url, "using navigation preload response");
            return Ok(FetchOutcome::new(response, ResponseSource::Preload, strategy));
        }

        let request = event.request;
        match self.network.fetch(&request).await {
            Ok(response) => {
                if !request.is_navigation() {
                    self.cache.store(&request, response.clone()).await;
                }
                Ok(FetchOutcome::new(response, ResponseSource::Network, strategy))
            }
            Err(e) if e.is_network_failure() => {
                if request.is_navigation() {
                    return self.offline_fallback(e, strategy).await;
                }
                match self.cache.lookup(&request.key()).await {
                    Some(response) => Ok(FetchOutcome::new(response, ResponseSource::Cache, strategy)),
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn network_only_with_fallback(&self, mut event: FetchEvent) -> Result<FetchOutcome, Error> {
        let strategy = Some(Strategy::NetworkOnlyWithFallback);
        if let Some(response) = self.preloaded(&mut event).await {
            return Ok(FetchOutcome::new(response, ResponseSource::Preload, strategy));
        }

        match self.network.fetch(&event.request).await {
            Ok(response) => Ok(FetchOutcome::new(response, ResponseSource::Network, strategy)),
            Err(e) if e.is_network_failure() => self.offline_fallback(e, strategy).await,
            Err(e) => Err(e),
        }
    }

    async fn stale_while_revalidate(&self, request: RequestDescriptor) -> Result<FetchOutcome, Error> {
        let strategy = Some(Strategy::StaleWhileRevalidate);
        let Some(cached) = self.cache.lookup(&request.key()).await else {
            return self.fetch_and_store(request, strategy).await;
        };

        let cache = self.cache.clone();
        let network = Arc::clone(&self.network);
        let revalidation = tokio::spawn(async move {
            match network.fetch(&request).await {
                Ok(response) => {
                    if cache.store(&request, response).await {
                        tracing::debug!(url = %request.url, "revalidated cache entry");
                    }
                }
                Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation failed, keeping cached entry"),
            }
        });

        let mut outcome = FetchOutcome::new(cached, ResponseSource::Cache, strategy);
        outcome.revalidation = Some(revalidation);
        Ok(outcome)
    }

    async fn cache_first(&self, request: RequestDescriptor) -> Result<FetchOutcome, Error> {
        let strategy = Some(Strategy::CacheFirst);
        if let Some(cached) = self.cache.lookup(&request.key()).await {
            return Ok(FetchOutcome::new(cached, ResponseSource::Cache, strategy));
        }
        self.fetch_and_store(request, strategy).await
    }

    async fn fetch_and_store(
        &self, request: RequestDescriptor, strategy: Option<Strategy>,
    ) -> Result<FetchOutcome, Error> {
        let response = self.network.fetch(&request).await?;
        self.cache.store(&request, response.clone()).await;
        Ok(FetchOutcome::new(response, ResponseSource::Network, strategy))
    }

    async fn offline_fallback(&self, cause: Error, strategy: Option<Strategy>) -> Result<FetchOutcome, Error> {
        match self.cache.lookup(&self.offline_fallback).await {
            Some(page) => {
                tracing::info!(error = %cause, fallback = %self.offline_fallback.url, "network unavailable, serving offline page");
                Ok(FetchOutcome::new(page, ResponseSource::OfflineFallback, strategy))
            }
            None => {
                tracing::warn!(error = %cause, fallback = %self.offline_fallback.url, "offline page not cached");
                Err(cause)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::testing::ScriptedNetwork;
    use crate::request::{Destination, RequestMode};
    use crate::response::ResponseKind;
    use crate::worker::policy::OpaquePolicy;
    use futures_util::FutureExt;
    use std::time::Duration;
    use url::Url;

    const TAG: &str = "artisan-connect-cache-test";

    fn origin() -> Url {
        Url::parse("http://localhost:3000").unwrap()
    }

    fn url(path: &str) -> String {
        origin().join(path).unwrap().to_string()
    }

    async fn setup_with(policy: CachePolicy, max_opaque: usize) -> (CacheDb, Arc<ScriptedNetwork>, FetchInterceptor) {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_generation(TAG).await.unwrap();
        let network = Arc::new(ScriptedNetwork::new());
        let interceptor = FetchInterceptor::new(
            db.clone(),
            network.clone(),
            TAG,
            Arc::new(RoutingTable::builtin()),
            Arc::new(policy),
            RequestKey::get(&origin().join("/index.html").unwrap()),
            max_opaque,
        );
        (db, network, interceptor)
    }

    async fn setup() -> (CacheDb, Arc<ScriptedNetwork>, FetchInterceptor) {
        setup_with(CachePolicy::default(), 50).await
    }

    async fn seed(db: &CacheDb, path: &str, body: &str) {
        let u = origin().join(path).unwrap();
        db.put_entry(TAG, &RequestKey::get(&u), CapturedResponse::ok(u.as_str(), body.to_string()))
            .await
            .unwrap();
    }

    fn script(path: &str) -> RequestDescriptor {
        RequestDescriptor::resolve(&origin(), path).unwrap().with_destination(Destination::Script)
    }

    #[tokio::test]
    async fn test_decide_is_synchronous_routing() {
        let (_db, network, interceptor) = setup().await;
        let post = RequestDescriptor::resolve(&origin(), "/api/reviews").unwrap().with_method("POST");
        assert_eq!(interceptor.decide(&post), FetchDecision::Passthrough);

        let nav = RequestDescriptor::navigate(&origin(), "/").unwrap();
        assert_eq!(
            interceptor.decide(&nav),
            FetchDecision::Intercept { rule: "navigation".into(), strategy: Strategy::NetworkFirst }
        );
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_passthrough_is_never_cached() {
        let (db, network, interceptor) = setup().await;
        network.respond_ok(&url("/api/reviews"), "created");
        let post = RequestDescriptor::resolve(&origin(), "/api/reviews").unwrap().with_method("POST");

        let outcome = interceptor.handle(FetchEvent::new(post)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(outcome.strategy, None);
        assert_eq!(db.count_entries(TAG).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_navigation_online_uses_network() {
        let (db, network, interceptor) = setup().await;
        seed(&db, "/index.html", "offline shell").await;
        network.respond_ok(&url("/artisans"), "fresh page");

        let nav = RequestDescriptor::navigate(&origin(), "/artisans").unwrap();
        let outcome = interceptor.handle(FetchEvent::new(nav)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(outcome.response.body.as_ref(), b"fresh page");
    }

    #[tokio::test]
    async fn test_navigation_offline_serves_fallback_page() {
        let (db, network, interceptor) = setup().await;
        seed(&db, "/index.html", "offline shell").await;
        network.set_offline(true);

        let nav = RequestDescriptor::navigate(&origin(), "/artisans/7").unwrap();
        let outcome = interceptor.handle(FetchEvent::new(nav)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::OfflineFallback);
        assert_eq!(outcome.response.body.as_ref(), b"offline shell");
    }

    #[tokio::test]
    async fn test_navigation_http_error_is_not_fallback() {
        let (db, network, interceptor) = setup().await;
        seed(&db, "/index.html", "offline shell").await;
        network.respond(&url("/gone"), CapturedResponse::ok(&url("/gone"), "nope").with_status(404, "Not Found"));

        let nav = RequestDescriptor::navigate(&origin(), "/gone").unwrap();
        let outcome = interceptor.handle(FetchEvent::new(nav)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(outcome.response.status, 404);
    }

    #[tokio::test]
    async fn test_navigation_oversized_body_is_not_fallback() {
        let (db, network, interceptor) = setup().await;
        seed(&db, "/index.html", "offline shell").await;
        network.too_large(&url("/catalog"), 1024);

        let nav = RequestDescriptor::navigate(&origin(), "/catalog").unwrap();
        let result = interceptor.handle(FetchEvent::new(nav)).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_navigation_offline_without_fallback_errors() {
        let (_db, network, interceptor) = setup().await;
        network.set_offline(true);

        let nav = RequestDescriptor::navigate(&origin(), "/").unwrap();
        let result = interceptor.handle(FetchEvent::new(nav)).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_navigation_preload_preferred_when_enabled() {
        let (_db, network, interceptor) = setup().await;
        interceptor.set_navigation_preload(true);
        network.respond_ok(&url("/"), "second fetch");

        let nav = RequestDescriptor::navigate(&origin(), "/").unwrap();
        let preloaded = CapturedResponse::ok(&url("/"), "preloaded");
        let event = FetchEvent::new(nav).with_preload(async move { Some(preloaded) }.boxed());

        let outcome = interceptor.handle(event).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Preload);
        assert_eq!(outcome.response.body.as_ref(), b"preloaded");
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_navigation_preload_ignored_when_disabled_or_empty() {
        let (_db, network, interceptor) = setup().await;
        network.respond_ok(&url("/"), "network");

        let nav = RequestDescriptor::navigate(&origin(), "/").unwrap();
        let event = FetchEvent::new(nav.clone())
            .with_preload(async { Some(CapturedResponse::ok("http://localhost:3000/", "preloaded")) }.boxed());
        let outcome = interceptor.handle(event).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);

        interceptor.set_navigation_preload(true);
        let event = FetchEvent::new(nav).with_preload(async { None }.boxed());
        let outcome = interceptor.handle(event).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(network.calls(), 2);
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_returns_cached_without_waiting() {
        let (db, network, interceptor) = setup().await;
        seed(&db, "/app.js", "v1 code").await;
        network.respond_ok(&url("/app.js"), "v2 code");
        let gate = network.gate(&url("/app.js"));

        let outcome = tokio::time::timeout(Duration::from_secs(1), interceptor.handle(FetchEvent::new(script("/app.js"))))
            .await
            .expect("stale response must not wait on the network")
            .unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(outcome.response.body.as_ref(), b"v1 code");

        gate.notify_one();
        outcome.revalidation.unwrap().await.unwrap();

        let key = RequestKey::get(&origin().join("/app.js").unwrap());
        let entry = db.get_entry(TAG, &key).await.unwrap().unwrap();
        assert_eq!(entry.response.body.as_ref(), b"v2 code");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_outlives_dropped_handle() {
        let (db, network, interceptor) = setup().await;
        seed(&db, "/style.css", "old").await;
        network.respond_ok(&url("/style.css"), "new");

        let request = RequestDescriptor::resolve(&origin(), "/style.css").unwrap().with_destination(Destination::Style);
        let outcome = interceptor.handle(FetchEvent::new(request)).await.unwrap();
        drop(outcome);

        let key = RequestKey::get(&origin().join("/style.css").unwrap());
        let mut refreshed = false;
        for _ in 0..50 {
            let entry = db.get_entry(TAG, &key).await.unwrap().unwrap();
            if entry.response.body.as_ref() == b"new" {
                refreshed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refreshed);
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_failure_keeps_entry() {
        let (db, network, interceptor) = setup().await;
        seed(&db, "/app.js", "v1 code").await;
        network.set_offline(true);

        let outcome = interceptor.handle(FetchEvent::new(script("/app.js"))).await.unwrap();
        assert_eq!(outcome.response.body.as_ref(), b"v1 code");
        outcome.revalidation.unwrap().await.unwrap();

        let entry = db
            .get_entry(TAG, &RequestKey::get(&origin().join("/app.js").unwrap()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.response.body.as_ref(), b"v1 code");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_miss_fetches_and_stores() {
        let (db, network, interceptor) = setup().await;
        network.respond_ok(&url("/font.woff2"), "font");
        let request = RequestDescriptor::resolve(&origin(), "/font.woff2").unwrap().with_destination(Destination::Font);

        let outcome = interceptor.handle(FetchEvent::new(request)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert!(outcome.revalidation.is_none());
        assert_eq!(db.count_entries(TAG).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_hit_skips_network() {
        let (db, network, interceptor) = setup().await;
        seed(&db, "/metadata.json", "{}").await;

        let request = RequestDescriptor::resolve(&origin(), "/metadata.json").unwrap();
        let outcome = interceptor.handle(FetchEvent::new(request)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_miss_stores_clone() {
        let (_db, network, interceptor) = setup().await;
        network.respond_ok(&url("/api/artisans"), "[{\"id\":1}]");

        let request = RequestDescriptor::resolve(&origin(), "/api/artisans").unwrap();
        let first = interceptor.handle(FetchEvent::new(request.clone())).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);

        let second = interceptor.handle(FetchEvent::new(request)).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response, first.response);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_error_status_passes_through_uncached() {
        let (db, network, interceptor) = setup().await;
        network.respond(&url("/broken"), CapturedResponse::ok(&url("/broken"), "oops").with_status(500, "Server Error"));

        let request = RequestDescriptor::resolve(&origin(), "/broken").unwrap();
        let outcome = interceptor.handle(FetchEvent::new(request)).await.unwrap();
        assert_eq!(outcome.response.status, 500);
        assert_eq!(db.count_entries(TAG).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_offline_miss_errors() {
        let (_db, network, interceptor) = setup().await;
        network.set_offline(true);
        let request = RequestDescriptor::resolve(&origin(), "/api/artisans").unwrap();
        assert!(interceptor.handle(FetchEvent::new(request)).await.is_err());
    }

    #[tokio::test]
    async fn test_opaque_cached_by_default_and_capped() {
        let (db, network, interceptor) = setup_with(CachePolicy::default(), 2).await;
        for i in 0..3 {
            let u = format!("https://cdn.example.com/lib{i}.js");
            network.respond(&u, CapturedResponse::opaque(&u, "lib"));
            let request = RequestDescriptor::get(&u).unwrap().with_mode(RequestMode::NoCors);
            interceptor.handle(FetchEvent::new(request)).await.unwrap();
        }

        let entries = db.list_entries(TAG).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.kind == ResponseKind::Opaque.as_str()));
        assert!(!entries.iter().any(|e| e.url.ends_with("lib0.js")));
    }

    #[tokio::test]
    async fn test_opaque_skipped_when_policy_says_so() {
        let (db, network, interceptor) = setup_with(CachePolicy::new(OpaquePolicy::Skip, Vec::new()), 50).await;
        let u = "https://cdn.tailwindcss.com/";
        network.respond(u, CapturedResponse::opaque(u, "tw"));

        let request = RequestDescriptor::get(u).unwrap().with_mode(RequestMode::NoCors);
        let outcome = interceptor.handle(FetchEvent::new(request)).await.unwrap();
        assert_eq!(outcome.response.status, 0);
        assert_eq!(db.count_entries(TAG).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_responds() {
        let (db, network, interceptor) = setup().await;
        db.delete_generation(TAG).await.unwrap();
        network.respond_ok(&url("/api/artisans"), "[]");

        let request = RequestDescriptor::resolve(&origin(), "/api/artisans").unwrap();
        let outcome = interceptor.handle(FetchEvent::new(request)).await.unwrap();
        assert_eq!(outcome.response.body.as_ref(), b"[]");
        assert!(db.list_generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_cache_first_same_url() {
        let (db, network, interceptor) = setup().await;
        let body = "x".repeat(64 * 1024);
        network.respond_ok(&url("/api/artisans"), &body);
        network.set_delay(Duration::from_millis(10));

        let request = RequestDescriptor::resolve(&origin(), "/api/artisans").unwrap();
        let (a, b) = tokio::join!(
            interceptor.handle(FetchEvent::new(request.clone())),
            interceptor.handle(FetchEvent::new(request.clone()))
        );
        assert_eq!(a.unwrap().response.body.len(), body.len());
        assert_eq!(b.unwrap().response.body.len(), body.len());

        let entry = db.get_entry(TAG, &request.key()).await.unwrap().unwrap();
        assert_eq!(entry.response.body.as_ref(), body.as_bytes());
        assert_eq!(db.count_entries(TAG).await.unwrap(), 1);

        let calls_before = network.calls();
        let third = interceptor.handle(FetchEvent::new(request)).await.unwrap();
        assert_eq!(third.source, ResponseSource::Cache);
        assert_eq!(network.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_network_first_non_navigation_falls_back_to_own_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_generation(TAG).await.unwrap();
        let network = Arc::new(ScriptedNetwork::new());
        let routes = RoutingTable::with_custom(&[crate::worker::routing::RouteConfig {
            name: Some("api".into()),
            destinations: Vec::new(),
            url_prefix: Some(url("/api/")),
            url_pattern: None,
            method: None,
            navigation: None,
            strategy: Strategy::NetworkFirst,
        }])
        .unwrap();
        let interceptor = FetchInterceptor::new(
            db.clone(),
            network.clone(),
            TAG,
            Arc::new(routes),
            Arc::new(CachePolicy::default()),
            RequestKey::get(&origin().join("/index.html").unwrap()),
            50,
        );

        network.respond_ok(&url("/api/artisans"), "online list");
        let request = RequestDescriptor::resolve(&origin(), "/api/artisans").unwrap();
        let online = interceptor.handle(FetchEvent::new(request.clone())).await.unwrap();
        assert_eq!(online.source, ResponseSource::Network);

        network.set_offline(true);
        let offline = interceptor.handle(FetchEvent::new(request)).await.unwrap();
        assert_eq!(offline.source, ResponseSource::Cache);
        assert_eq!(offline.response.body.as_ref(), b"online list");
    }
}
