//! Core data model definitions shared across Glider crates.
//!
//! Everything here is plain serde data: the build record as the registry
//! publishes it, the submission a caller posts, the result the executor
//! reports, and the documents exchanged with the executor service.
#![allow(missing_docs)]

pub mod build;
pub mod error;
pub mod executor;
pub mod ids;

pub use build::{
    BuildPhase, BuildRecord, BuildResult, BuildSubmission, SessionEndpoints,
};
pub use error::{ModelError, Result as ModelResult};
pub use executor::{
    CallbackUrls, ExecutorAcceptance, ExecutorBuild, ExecutorBuildConfig,
    ExecutorInput, ExecutorInputSource,
};
pub use ids::BuildId;
