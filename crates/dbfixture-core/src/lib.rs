//! dbfixture Core - configuration and pure provisioning logic
//!
//! This crate holds everything the provisioner needs that does not touch a
//! process or a database:
//! - Provisioning configuration and its layered loader
//! - Ephemeral port allocation
//! - Readiness detection over server log text
//! - Connection endpoint templates
//! - The error and logging facilities shared by the other crates

pub mod config;
pub mod endpoint;
pub mod errors;
pub mod logging_facility;
pub mod port;
pub mod readiness;

pub use dbfixture_core_types::schema;

// Re-export commonly used types
pub use config::{BackendKind, ConfigSource, LayeredConfigSource, Platform, ProvisioningConfig};
pub use endpoint::{ConnectionEndpoint, ConnectionTemplate};
pub use errors::{ExError, ExErrorKind, ProvisionError, Result};
pub use port::PortAllocator;
pub use readiness::{LinuxReadiness, ReadinessDetector, WindowsReadiness};
