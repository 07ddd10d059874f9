//! Error helpers for dbfixture-store
//!
//! Maps process and sqlcmd outcomes onto the core `ProvisionError` taxonomy.

use crate::process::{CommandOutput, CommandSpec};
use dbfixture_core::errors::ProvisionError;

pub use dbfixture_core::errors::Result;

/// SQL Server message for a drop blocked by open sessions (error 3702)
const CATALOG_IN_USE_MESSAGE: &str = "currently in use";

/// The program could not be started
pub fn spawn_error(spec: &CommandSpec, err: std::io::Error) -> ProvisionError {
    ProvisionError::ProcessSpawn {
        program: spec.program().to_string(),
        reason: err.to_string(),
    }
}

/// The program ran and exited unsuccessfully
pub fn process_failed(spec: &CommandSpec, output: &CommandOutput) -> ProvisionError {
    ProvisionError::ProcessFailed {
        command: spec.to_string(),
        status: output.status,
        stderr: output.diagnostic().to_string(),
    }
}

/// A SQL batch failed; recognises the catalog-in-use case
pub fn sql_failure(catalog: &str, output: &CommandOutput) -> ProvisionError {
    let diagnostic = output.diagnostic();
    if diagnostic.contains(CATALOG_IN_USE_MESSAGE) {
        return ProvisionError::CatalogInUse {
            catalog: catalog.to_string(),
        };
    }
    ProvisionError::SqlExecution {
        catalog: catalog.to_string(),
        reason: diagnostic.to_string(),
    }
}
