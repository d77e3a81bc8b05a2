//! The caching worker: lifecycle, routing and fetch handling.
//!
//! A [`ServiceWorker`] is one deployed version, bound to one cache
//! generation. The [`Registration`] owns the active and waiting versions and
//! drives install → activate → fetch.

pub mod generations;
pub mod host;
pub mod interceptor;
pub mod manifest;
pub mod message;
pub mod policy;
pub mod registration;
pub mod routing;
pub mod seeder;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::CacheDb;
use crate::config::AppConfig;
use crate::network::Network;
use crate::request::RequestKey;

pub use generations::{ActivationReport, GenerationManager};
pub use host::{HostCapabilities, StaticCapabilities};
pub use interceptor::{FetchDecision, FetchEvent, FetchInterceptor, FetchOutcome, ResponseSource};
pub use manifest::AssetManifest;
pub use message::{ControlMessage, MessageReply};
pub use policy::{CachePolicy, OpaquePolicy};
pub use registration::{InstallReport, Registration, RegistrationStatus, WorkerSummary};
pub use routing::{RouteConfig, RoutingTable, Strategy};
pub use seeder::{SeedReport, Seeder};

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    /// Controlling pages.
    Activated,
    /// Replaced, or failed to install or activate.
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Redundant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a worker version needs, resolved and validated.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub generation: String,
    pub origin: Url,
    pub manifest: AssetManifest,
    pub offline_fallback: RequestKey,
    pub routes: Arc<RoutingTable>,
    pub policy: Arc<CachePolicy>,
    pub install_concurrency: usize,
    pub max_opaque_entries: usize,
    pub navigation_preload: bool,
    pub skip_waiting: bool,
}

impl WorkerSettings {
    /// Build worker settings from loaded configuration.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the configuration does not validate.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let manifest = AssetManifest::resolve(&origin, &config.manifest)?;
        let fallback = crate::url::resolve(&origin, &config.offline_fallback)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.offline_fallback)))?;

        Ok(Self {
            generation: config.generation_tag(),
            offline_fallback: RequestKey::get(&fallback),
            manifest,
            origin,
            routes: Arc::new(RoutingTable::with_custom(&config.routes)?),
            policy: Arc::new(CachePolicy::new(config.opaque_policy, config.opaque_skip_prefixes.clone())),
            install_concurrency: config.install_concurrency,
            max_opaque_entries: config.max_opaque_entries,
            navigation_preload: config.navigation_preload,
            skip_waiting: config.skip_waiting,
        })
    }
}

/// One worker version.
pub struct ServiceWorker {
    settings: WorkerSettings,
    state: RwLock<WorkerState>,
    interceptor: FetchInterceptor,
}

impl ServiceWorker {
    pub fn new(settings: WorkerSettings, store: CacheDb, network: Arc<dyn Network>) -> Self {
        let interceptor = FetchInterceptor::new(
            store,
            network,
            &settings.generation,
            Arc::clone(&settings.routes),
            Arc::clone(&settings.policy),
            settings.offline_fallback.clone(),
            settings.max_opaque_entries,
        );
        Self { settings, state: RwLock::new(WorkerState::Parsed), interceptor }
    }

    pub fn generation(&self) -> &str {
        &self.settings.generation
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn interceptor(&self) -> &FetchInterceptor {
        &self.interceptor
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(generation = %self.settings.generation, from = %*current, to = %state, "worker state change");
        *current = state;
    }
}

impl fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("generation", &self.settings.generation)
            .field("state", &self.state())
            .finish()
    }
}
