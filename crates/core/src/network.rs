//! Outbound fetch abstraction.
//!
//! The worker never talks to HTTP directly. Hosts inject a [`Network`]:
//! `swcache-client` provides the reqwest implementation, tests provide a
//! scripted one.

use async_trait::async_trait;

use crate::Error;
use crate::request::RequestDescriptor;
use crate::response::CapturedResponse;

/// Something that can perform a request.
///
/// HTTP error statuses are successful fetches (`Ok` with a 4xx/5xx
/// response). `Err` means the request never produced a response: offline,
/// DNS failure, timeout, oversized body.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, Error>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted network double.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Clone)]
    pub enum Reply {
        Respond(CapturedResponse),
        Fail(String),
        TooLarge(usize),
    }

    /// Network whose answers are keyed by URL.
    ///
    /// Unknown URLs fail as if offline. `set_offline(true)` fails every
    /// request. A gate makes matching requests wait until released.
    #[derive(Default)]
    pub struct ScriptedNetwork {
        replies: Mutex<HashMap<String, Reply>>,
        offline: Mutex<bool>,
        delay: Mutex<Option<Duration>>,
        gates: Mutex<HashMap<String, std::sync::Arc<Notify>>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<RequestDescriptor>>,
    }

    impl ScriptedNetwork {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, url: &str, response: CapturedResponse) {
            self.replies.lock().unwrap().insert(url.to_string(), Reply::Respond(response));
        }

        pub fn respond_ok(&self, url: &str, body: &str) {
            self.respond(url, CapturedResponse::ok(url, body.to_string()));
        }

        pub fn fail(&self, url: &str, reason: &str) {
            self.replies.lock().unwrap().insert(url.to_string(), Reply::Fail(reason.to_string()));
        }

        /// Answer `url` with a body larger than `limit`.
        pub fn too_large(&self, url: &str, limit: usize) {
            self.replies.lock().unwrap().insert(url.to_string(), Reply::TooLarge(limit));
        }

        pub fn set_offline(&self, offline: bool) {
            *self.offline.lock().unwrap() = offline;
        }

        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        /// Hold requests for `url` until the returned handle is notified.
        pub fn gate(&self, url: &str) -> std::sync::Arc<Notify> {
            let notify = std::sync::Arc::new(Notify::new());
            self.gates.lock().unwrap().insert(url.to_string(), notify.clone());
            notify
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn calls_for(&self, url: &str) -> usize {
            self.seen.lock().unwrap().iter().filter(|r| r.url.as_str() == url).count()
        }

        pub fn seen(&self) -> Vec<RequestDescriptor> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Network for ScriptedNetwork {
        async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());

            let gate = self.gates.lock().unwrap().get(request.url.as_str()).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if *self.offline.lock().unwrap() {
                return Err(Error::Network(format!("offline: {}", request.url)));
            }

            let reply = self.replies.lock().unwrap().get(request.url.as_str()).cloned();
            match reply {
                Some(Reply::Respond(response)) => Ok(response),
                Some(Reply::Fail(reason)) => Err(Error::Network(reason)),
                Some(Reply::TooLarge(limit)) => Err(Error::FetchTooLarge(format!("body exceeds {limit} bytes"))),
                None => Err(Error::Network(format!("no route to {}", request.url))),
            }
        }
    }
}
