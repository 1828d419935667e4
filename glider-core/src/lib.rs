//! Core library for Glider.
//!
//! Glider accepts build submissions, delegates execution to an external
//! executor service and brokers the traffic around a running build. This
//! crate holds the pieces that make that brokering safe under concurrent
//! access:
//!
//! - [`log_channel`]: per-build log fan-out with history replay.
//! - [`rendezvous`]: single-slot handoff of the uploaded bits.
//! - [`registry`]: the shared map of build records.
//! - [`executor`]: the outbound executor client.
//! - [`coordinator`]: the lifecycle that ties them together.
#![allow(missing_docs)]

pub mod coordinator;
pub mod error;
pub mod executor;
pub mod log_channel;
pub mod registry;
pub mod rendezvous;

pub use coordinator::{Coordinator, CoordinatorSettings};
pub use error::{
    CoordinatorError, ExecutorError, LogChannelError, RegistryError,
    RendezvousError, Result,
};
pub use executor::{Executor, HttpExecutor, RelayRequest, RelayResponse};
pub use log_channel::{LogChannel, LogSink, LogStream, OBSERVER_BACKLOG};
pub use registry::BuildRegistry;
pub use rendezvous::{
    BitsPayload, DrainGuard, DrainOutcome, DrainingStream, Handoff, Rendezvous,
};
