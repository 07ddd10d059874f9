//! dbfixture Engine - provisioning orchestration
//!
//! Coordinates the pure logic in `dbfixture-core` with the process and SQL
//! plumbing in `dbfixture-store`:
//! - A bounded worker pool for concurrent command dispatch
//! - The container orchestrator (stop previous, run, poll, resolve address)
//! - The provisioner facade driving initialize and teardown

#![allow(clippy::result_large_err)]

pub mod container;
pub mod pool;
pub mod provisioner;

pub use container::{ContainerHandle, ContainerOrchestrator};
pub use pool::WorkerPool;
pub use provisioner::{EndpointSlot, Provisioner, ProvisionerState};
