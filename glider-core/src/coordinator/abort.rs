use glider_model::BuildId;
use tracing::info;

use super::Coordinator;
use crate::{
    error::{CoordinatorError, Result},
    executor::{RelayRequest, RelayResponse},
};

impl Coordinator {
    /// Forwards an abort to the executor endpoint recorded for the build.
    /// Whatever the executor answers is handed back for the caller to relay.
    pub async fn abort(
        &self,
        id: &BuildId,
        request: RelayRequest,
    ) -> Result<RelayResponse> {
        let url = self
            .registry
            .get(id)?
            .abort_url()
            .cloned()
            .ok_or(CoordinatorError::NoSessionEndpoint("abort"))?;

        let response = self.executor.relay(&url, request).await?;
        info!(build_id = %id, status = %response.status, "abort relayed");
        Ok(response)
    }
}
