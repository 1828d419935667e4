//! Lifecycle of a single build, from submission to its final result.

mod abort;

use std::{sync::Arc, time::Duration};

use glider_config::Config;
use glider_model::{
    BuildId, BuildPhase, BuildRecord, BuildResult, BuildSubmission,
    CallbackUrls, ExecutorBuild, SessionEndpoints,
};
use tracing::{info, warn};
use url::Url;

use crate::{
    error::{CoordinatorError, Result},
    executor::Executor,
    log_channel::LogChannel,
    registry::BuildRegistry,
    rendezvous::{BitsPayload, DrainOutcome, Handoff},
};

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// `host:port` the executor uses to call back into this server.
    pub peer_addr: String,
    pub bits_fetch_timeout: Duration,
    pub bits_pickup_timeout: Duration,
}

impl From<&Config> for CoordinatorSettings {
    fn from(config: &Config) -> Self {
        Self {
            peer_addr: config.server.peer_addr.clone(),
            bits_fetch_timeout: config.bits.fetch_timeout,
            bits_pickup_timeout: config.bits.pickup_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    registry: Arc<BuildRegistry>,
    executor: Arc<dyn Executor>,
    settings: CoordinatorSettings,
}

impl Coordinator {
    pub fn new(
        registry: Arc<BuildRegistry>,
        executor: Arc<dyn Executor>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            registry,
            executor,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<BuildRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn create(&self, submission: BuildSubmission) -> Result<BuildRecord> {
        let record = self.registry.create(submission)?;
        info!(
            build_id = %record.guid,
            image = %record.image(),
            "build created"
        );
        Ok(record)
    }

    pub fn get(&self, id: &BuildId) -> Result<BuildRecord> {
        Ok(self.registry.get(id)?)
    }

    pub fn list(&self) -> Vec<BuildRecord> {
        self.registry.list()
    }

    /// Delegates the build to the executor and hands `payload` over once it
    /// is accepted. Returns only after the executor has drained the bits.
    pub async fn upload_bits(
        &self,
        id: &BuildId,
        payload: BitsPayload,
    ) -> Result<BuildRecord> {
        let record = self.registry.begin_delegation(id)?;
        let bits = self.registry.bits(id)?;

        let callbacks = CallbackUrls::for_build(&self.settings.peer_addr, id)
            .map_err(|err| CoordinatorError::Internal(err.to_string()))?;
        let request = ExecutorBuild::new(*id, &record.submission, callbacks);

        self.registry.set_phase(id, BuildPhase::BitsInFlight)?;
        let acceptance = match self.executor.submit(&request).await {
            Ok(acceptance) => acceptance,
            Err(err) => {
                warn!(
                    build_id = %id,
                    error = %err,
                    "executor did not accept build"
                );
                self.registry.set_phase(id, BuildPhase::Rejected)?;
                return Err(err.into());
            }
        };

        let endpoints = SessionEndpoints::from(acceptance);
        if !endpoints.is_empty() {
            self.registry.set_session_endpoints(id, endpoints)?;
        }
        self.registry.set_phase(id, BuildPhase::Accepted)?;
        info!(build_id = %id, "executor accepted build");

        let outcome = match bits
            .deliver(payload, self.settings.bits_pickup_timeout)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    build_id = %id,
                    error = %err,
                    "executor never fetched bits"
                );
                return Err(CoordinatorError::BitsNotFetched);
            }
        };

        match outcome {
            DrainOutcome::Completed => {
                Ok(self.registry.set_phase(id, BuildPhase::Running)?)
            }
            DrainOutcome::Interrupted => {
                warn!(build_id = %id, "bits transfer interrupted");
                Err(CoordinatorError::BitsInterrupted)
            }
        }
    }

    /// Executor side of the bits transfer: waits for an upload to arrive.
    pub async fn fetch_bits(
        &self,
        id: &BuildId,
    ) -> Result<Handoff<BitsPayload>> {
        let bits = self.registry.bits(id)?;
        bits.fetch(self.settings.bits_fetch_timeout)
            .await
            .map_err(|_| CoordinatorError::BitsTimedOut)
    }

    /// Records the executor's terminal status and ends the build's log.
    pub fn record_result(
        &self,
        id: &BuildId,
        result: BuildResult,
    ) -> Result<BuildResult> {
        result.validate()?;
        let record = self.registry.complete(id, result.status.clone())?;
        info!(build_id = %id, status = %result.status, "build completed");
        Ok(BuildResult::new(record.status.unwrap_or_default()))
    }

    /// Current status; empty while the build is still running.
    pub fn result(&self, id: &BuildId) -> Result<BuildResult> {
        let record = self.registry.get(id)?;
        Ok(BuildResult::new(record.status.unwrap_or_default()))
    }

    pub fn log_channel(&self, id: &BuildId) -> Result<Arc<LogChannel>> {
        Ok(self.registry.log_channel(id)?)
    }

    pub fn hijack_endpoint(&self, id: &BuildId) -> Result<Url> {
        self.registry
            .get(id)?
            .hijack_url()
            .cloned()
            .ok_or(CoordinatorError::NoSessionEndpoint("hijack"))
    }
}
