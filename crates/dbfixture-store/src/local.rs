//! Catalog management on an already running local engine
//!
//! All statements go through the admin (master) endpoint. Catalog names are
//! bracket-quoted where they appear as identifiers and quote-doubled where
//! they appear as string literals.

use crate::errors::Result;
use crate::sql::SqlExecutor;
use dbfixture_core::errors::ProvisionError;
use dbfixture_core::schema::{OP_CREATE_CATALOG, OP_DROP_CATALOG};
use dbfixture_core::{log_op_end, log_op_error, log_op_start, ConnectionEndpoint};
use std::sync::Arc;
use std::time::Instant;

/// Quote a name for use as an identifier: `a]b` becomes `[a]]b]`
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Quote a name for use as a string literal: `a'b` becomes `'a''b'`
pub fn quote_literal(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

pub fn exists_probe(name: &str) -> String {
    format!(
        "if exists(select * from sys.databases where name = {}) select 'true' else select 'false'",
        quote_literal(name)
    )
}

pub fn create_statement(name: &str) -> String {
    format!("CREATE DATABASE {};", quote_identifier(name))
}

/// Terminate other sessions, then drop
pub fn drop_statement(name: &str) -> String {
    let ident = quote_identifier(name);
    format!(
        "ALTER DATABASE {ident} SET SINGLE_USER WITH ROLLBACK IMMEDIATE; DROP DATABASE {ident};"
    )
}

/// Creates, probes and drops catalogs through SQL
pub struct LocalInstanceManager {
    executor: Arc<dyn SqlExecutor>,
    admin: ConnectionEndpoint,
}

impl LocalInstanceManager {
    /// `admin` must point at the `master` catalog of the target engine
    pub fn new(executor: Arc<dyn SqlExecutor>, admin: ConnectionEndpoint) -> Self {
        Self { executor, admin }
    }

    pub fn admin(&self) -> &ConnectionEndpoint {
        &self.admin
    }

    /// Whether a catalog named `name` exists
    pub async fn exists(&self, name: &str) -> Result<bool> {
        let scalar = self
            .executor
            .query_scalar(&self.admin, &exists_probe(name))
            .await?;
        Ok(scalar
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false))
    }

    /// Create `name` unless it already exists; returns whether a create was
    /// issued
    pub async fn create(&self, name: &str) -> Result<bool> {
        let start = Instant::now();
        log_op_start!(OP_CREATE_CATALOG, catalog = name);

        let result = self.create_inner(name).await;
        match &result {
            Ok(created) => log_op_end!(
                OP_CREATE_CATALOG,
                started = start,
                catalog = name,
                created = *created
            ),
            Err(err) => log_op_error!(OP_CREATE_CATALOG, err, started = start),
        }
        result
    }

    async fn create_inner(&self, name: &str) -> Result<bool> {
        if self.exists(name).await? {
            tracing::debug!(catalog = name, "Catalog already exists");
            return Ok(false);
        }
        self.executor
            .execute(&self.admin, &create_statement(name))
            .await?;
        Ok(true)
    }

    /// Drop `name` through `admin`; a missing catalog is a no-op
    ///
    /// Returns whether a drop was issued. Sessions still attached after the
    /// switch to single-user mode surface as `CatalogInUse`.
    pub async fn delete(&self, name: &str, admin: &ConnectionEndpoint) -> Result<bool> {
        let start = Instant::now();
        log_op_start!(OP_DROP_CATALOG, catalog = name);

        let result = self.delete_inner(name, admin).await;
        match &result {
            Ok(dropped) => log_op_end!(
                OP_DROP_CATALOG,
                started = start,
                catalog = name,
                dropped = *dropped
            ),
            Err(err) => log_op_error!(OP_DROP_CATALOG, err, started = start),
        }
        result
    }

    async fn delete_inner(&self, name: &str, admin: &ConnectionEndpoint) -> Result<bool> {
        if !self.exists(name).await? {
            return Ok(false);
        }
        match self.executor.execute(admin, &drop_statement(name)).await {
            Ok(()) => Ok(true),
            Err(ProvisionError::SqlExecution { reason, .. })
                if reason.contains("currently in use") =>
            {
                Err(ProvisionError::CatalogInUse {
                    catalog: name.to_string(),
                })
            }
            Err(ProvisionError::CatalogInUse { .. }) => Err(ProvisionError::CatalogInUse {
                catalog: name.to_string(),
            }),
            Err(err) => Err(err),
        }
    }
}
