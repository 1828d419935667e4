pub mod abort;
pub mod bits;
pub mod builds;
pub mod health;
pub mod logs;
pub mod result;

use glider_model::BuildId;

use crate::infra::errors::{AppError, AppResult};

/// Path ids that are not UUIDs cannot name a build.
pub(crate) fn parse_build_id(raw: &str) -> AppResult<BuildId> {
    raw.parse()
        .map_err(|_| AppError::not_found(format!("Build not found: {raw}")))
}
