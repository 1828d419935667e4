use std::{fmt, sync::Arc};

use anyhow::Context;
use glider_core::{
    BuildRegistry, Coordinator, CoordinatorSettings, Executor, HttpExecutor,
};

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("peer_addr", &self.config.server.peer_addr)
            .field("builds", &self.coordinator.registry().len())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wires a fresh registry to the HTTP executor named in `config`.
    pub fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        let executor = HttpExecutor::new(&config.executor)
            .context("failed to build executor client")?;
        Ok(Self::with_executor(config, Arc::new(executor)))
    }

    pub fn with_executor(
        config: Arc<Config>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let coordinator = Coordinator::new(
            Arc::new(BuildRegistry::new()),
            executor,
            CoordinatorSettings::from(config.as_ref()),
        );
        Self {
            coordinator: Arc::new(coordinator),
            config,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }
}
