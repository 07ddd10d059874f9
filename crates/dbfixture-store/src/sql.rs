//! SQL execution against the engine
//!
//! The provisioner only ever needs two shapes of statement: a probe that
//! returns one scalar, and DDL whose result is discarded. [`SqlcmdExecutor`]
//! implements both by shelling out to the `sqlcmd` client with arguments
//! derived from a [`ConnectionEndpoint`].

use crate::errors::{self, Result};
use crate::process::{CommandRunner, CommandSpec};
use async_trait::async_trait;
use dbfixture_core::ConnectionEndpoint;
use std::sync::Arc;

/// Query/execute interface to the SQL engine
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run `sql` and return the first column of the first row, if any
    async fn query_scalar(&self, endpoint: &ConnectionEndpoint, sql: &str)
        -> Result<Option<String>>;

    /// Run `sql`, discarding any result set
    async fn execute(&self, endpoint: &ConnectionEndpoint, sql: &str) -> Result<()>;
}

/// `SqlExecutor` that drives the `sqlcmd` command-line client
pub struct SqlcmdExecutor {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl SqlcmdExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_program(runner, "sqlcmd")
    }

    pub fn with_program(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// Build the sqlcmd invocation for `sql` against `endpoint`
    ///
    /// `-b` makes sqlcmd exit non-zero on a SQL error, `-h -1 -W` strips
    /// headers and padding so a scalar comes back as a bare line.
    pub fn command(&self, endpoint: &ConnectionEndpoint, sql: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.program)
            .args(["-S", endpoint.data_source()])
            .args(["-d", endpoint.catalog()])
            .args(["-b", "-h", "-1", "-W"]);

        if endpoint.flag("Integrated Security") {
            spec = spec.arg("-E");
        } else {
            if let Some(user) = endpoint.value("User ID") {
                spec = spec.args(["-U", user]);
            }
            if let Some(password) = endpoint.value("Password") {
                spec = spec.args(["-P", password]);
            }
        }
        if endpoint.flag("TrustServerCertificate") {
            spec = spec.arg("-C");
        }
        if let Some(timeout) = endpoint.value("Connect Timeout") {
            spec = spec.args(["-l", timeout]);
        }

        spec.arg("-Q").arg(format!("SET NOCOUNT ON; {}", sql))
    }

    async fn run(&self, endpoint: &ConnectionEndpoint, sql: &str) -> Result<String> {
        let spec = self.command(endpoint, sql);
        let output = self.runner.run(&spec).await?;
        if !output.is_success() {
            return Err(errors::sql_failure(endpoint.catalog(), &output));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl SqlExecutor for SqlcmdExecutor {
    async fn query_scalar(
        &self,
        endpoint: &ConnectionEndpoint,
        sql: &str,
    ) -> Result<Option<String>> {
        let stdout = self.run(endpoint, sql).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string))
    }

    async fn execute(&self, endpoint: &ConnectionEndpoint, sql: &str) -> Result<()> {
        self.run(endpoint, sql).await.map(|_| ())
    }
}
