//! Worker registration: active and waiting versions, lifecycle gating,
//! fetch and message dispatch.
//!
//! Lifecycle transitions (install, activate) are serialized by one async
//! mutex. The active/waiting slots sit behind short synchronous locks that
//! are never held across an await, so fetch dispatch never waits on a
//! running install.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::Mutex;

use super::generations::{ActivationReport, GenerationManager};
use super::host::HostCapabilities;
use super::interceptor::{FetchDecision, FetchEvent, FetchOutcome, ResponseSource};
use super::message::{ControlMessage, MessageReply};
use super::seeder::{SeedReport, Seeder};
use super::{ServiceWorker, WorkerSettings, WorkerState};
use crate::Error;
use crate::cache::CacheDb;
use crate::network::Network;
use crate::request::RequestDescriptor;

type Slot = RwLock<Option<Arc<ServiceWorker>>>;

/// Result of [`Registration::register`].
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct InstallReport {
    pub generation: String,
    pub entries: usize,
    pub bytes: u64,
    /// `activated`, or `installed` when the worker is waiting.
    pub state: WorkerState,
    pub activation: Option<ActivationReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct WorkerSummary {
    pub generation: String,
    pub state: WorkerState,
    pub navigation_preload: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct RegistrationStatus {
    pub active: Option<WorkerSummary>,
    pub waiting: Option<WorkerSummary>,
    pub clients: usize,
}

pub struct Registration {
    store: CacheDb,
    network: Arc<dyn Network>,
    host: Arc<dyn HostCapabilities>,
    active: Slot,
    waiting: Slot,
    lifecycle: Mutex<()>,
    clients: AtomicUsize,
}

fn read(slot: &Slot) -> Option<Arc<ServiceWorker>> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn replace(slot: &Slot, worker: Option<Arc<ServiceWorker>>) -> Option<Arc<ServiceWorker>> {
    std::mem::replace(&mut *slot.write().unwrap_or_else(PoisonError::into_inner), worker)
}

fn summary(worker: &ServiceWorker) -> WorkerSummary {
    WorkerSummary {
        generation: worker.generation().to_string(),
        state: worker.state(),
        navigation_preload: worker.interceptor().navigation_preload(),
    }
}

impl Registration {
    pub fn new(store: CacheDb, network: Arc<dyn Network>, host: Arc<dyn HostCapabilities>) -> Self {
        Self {
            store,
            network,
            host,
            active: RwLock::new(None),
            waiting: RwLock::new(None),
            lifecycle: Mutex::new(()),
            clients: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &CacheDb {
        &self.store
    }

    pub fn active(&self) -> Option<Arc<ServiceWorker>> {
        read(&self.active)
    }

    pub fn waiting(&self) -> Option<Arc<ServiceWorker>> {
        read(&self.waiting)
    }

    /// Install a worker version and activate it when nothing else is
    /// active or `skip_waiting` is set. Otherwise it waits for the open
    /// pages to close.
    ///
    /// # Errors
    ///
    /// `SeedFailed` when install fails; the new worker is redundant and the
    /// current one keeps serving. Activation errors leave the current
    /// worker in place.
    pub async fn register(&self, settings: WorkerSettings) -> Result<InstallReport, Error> {
        let _lifecycle = self.lifecycle.lock().await;

        let worker = Arc::new(ServiceWorker::new(settings, self.store.clone(), Arc::clone(&self.network)));
        let seed = self.install(&worker).await?;

        let activate_now = self.active().is_none() || worker.settings().skip_waiting;
        if let Some(previous) = replace(&self.waiting, Some(Arc::clone(&worker))) {
            tracing::info!(generation = previous.generation(), "waiting worker replaced");
            previous.set_state(WorkerState::Redundant);
        }

        let activation = if activate_now {
            Some(self.activate_locked().await?)
        } else {
            tracing::info!(generation = worker.generation(), "worker installed, waiting for clients to close");
            None
        };

        Ok(InstallReport {
            generation: seed.generation,
            entries: seed.entries,
            bytes: seed.bytes,
            state: worker.state(),
            activation,
        })
    }

    async fn install(&self, worker: &ServiceWorker) -> Result<SeedReport, Error> {
        worker.set_state(WorkerState::Installing);
        let settings = worker.settings();
        let seeder = Seeder::new(self.store.clone(), Arc::clone(&self.network), settings.install_concurrency);

        match seeder.seed(&settings.generation, &settings.manifest).await {
            Ok(report) => {
                worker.set_state(WorkerState::Installed);
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(generation = worker.generation(), error = %e, "install failed, worker is redundant");
                worker.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    /// Promote the waiting worker.
    ///
    /// Without `force` the worker stays waiting while clients are open.
    pub async fn activate_waiting(&self, force: bool) -> Result<MessageReply, Error> {
        let _lifecycle = self.lifecycle.lock().await;

        let Some(waiting) = self.waiting() else {
            return Ok(MessageReply::NothingWaiting);
        };

        let clients = self.clients.load(Ordering::SeqCst);
        if !force && clients > 0 {
            return Ok(MessageReply::StillWaiting { generation: waiting.generation().to_string(), clients });
        }

        let report = self.activate_locked().await?;
        Ok(MessageReply::Activated { generation: report.current })
    }

    /// Activate the waiting worker. Caller holds the lifecycle lock.
    ///
    /// The new generation is marked active and takes over fetch dispatch
    /// before superseded generations are deleted, so no fetch reads from a
    /// generation being removed and a missing generation leaves the store
    /// and the active worker untouched.
    async fn activate_locked(&self) -> Result<ActivationReport, Error> {
        let worker = self.waiting().ok_or_else(|| Error::InvalidState("no installed worker to activate".into()))?;
        worker.set_state(WorkerState::Activating);

        let generations = GenerationManager::new(self.store.clone());
        if let Err(e) = generations.promote(worker.generation()).await {
            tracing::warn!(generation = worker.generation(), error = %e, "activation failed, worker is redundant");
            worker.set_state(WorkerState::Redundant);
            replace(&self.waiting, None);
            return Err(e);
        }

        replace(&self.waiting, None);
        if let Some(old) = replace(&self.active, Some(Arc::clone(&worker))) {
            old.set_state(WorkerState::Redundant);
        }

        let report = generations.cleanup(worker.generation()).await.unwrap_or_else(|e| {
            tracing::warn!(generation = worker.generation(), error = %e, "could not list superseded generations");
            ActivationReport { current: worker.generation().to_string(), ..Default::default() }
        });

        if worker.settings().navigation_preload && self.host.supports_navigation_preload() {
            match self.host.enable_navigation_preload().await {
                Ok(()) => worker.interceptor().set_navigation_preload(true),
                Err(e) => tracing::warn!(error = %e, "could not enable navigation preload"),
            }
        }

        if let Err(e) = self.host.claim_clients().await {
            tracing::warn!(error = %e, "could not claim clients");
        }

        worker.set_state(WorkerState::Activated);
        tracing::info!(
            generation = worker.generation(),
            deleted = report.deleted.len(),
            navigation_preload = worker.interceptor().navigation_preload(),
            "worker activated"
        );
        Ok(report)
    }

    /// Synchronous intercept/passthrough decision.
    pub fn decide(&self, request: &RequestDescriptor) -> FetchDecision {
        match self.active() {
            Some(worker) => worker.interceptor().decide(request),
            None => FetchDecision::Passthrough,
        }
    }

    /// Dispatch a fetch to the active worker; without one the request goes
    /// straight to the network.
    pub async fn handle_fetch(&self, event: FetchEvent) -> Result<FetchOutcome, Error> {
        match self.active() {
            Some(worker) => worker.interceptor().handle(event).await,
            None => {
                let response = self.network.fetch(&event.request).await?;
                Ok(FetchOutcome { response, source: ResponseSource::Network, strategy: None, revalidation: None })
            }
        }
    }

    pub async fn post_message(&self, message: ControlMessage) -> Result<MessageReply, Error> {
        tracing::debug!(?message, "control message");
        match message {
            ControlMessage::SkipWaiting => self.activate_waiting(true).await,
            ControlMessage::ClientsClosed => {
                self.clients.store(0, Ordering::SeqCst);
                self.activate_waiting(false).await
            }
            ControlMessage::GetVersion => Ok(MessageReply::Version {
                active: self.active().map(|w| w.generation().to_string()),
                waiting: self.waiting().map(|w| w.generation().to_string()),
            }),
            ControlMessage::PurgeOpaque { keep } => {
                let worker = self.active().ok_or(Error::NoActiveWorker)?;
                let keep = keep.unwrap_or(worker.settings().max_opaque_entries);
                let deleted = GenerationManager::new(self.store.clone())
                    .purge_opaque(worker.generation(), keep)
                    .await?;
                Ok(MessageReply::Purged { deleted })
            }
        }
    }

    /// A page came under control. Returns the open client count.
    pub fn client_opened(&self) -> usize {
        self.clients.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn client_closed(&self) -> usize {
        let previous = self
            .clients
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or_else(|n| n);
        previous.saturating_sub(1)
    }

    pub fn status(&self) -> RegistrationStatus {
        RegistrationStatus {
            active: self.active().as_deref().map(summary),
            waiting: self.waiting().as_deref().map(summary),
            clients: self.clients.load(Ordering::SeqCst),
        }
    }
}
