//! Fakes shared by the store integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use dbfixture_core::{ConnectionEndpoint, ProvisionError, Result};
use dbfixture_store::{CommandOutput, CommandRunner, CommandSpec, SqlExecutor};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Runner that replays queued outputs and records every command
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<CommandOutput>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, output: CommandOutput) {
        self.responses.lock().unwrap().push_back(output);
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CommandOutput::success("")))
    }
}

/// In-memory engine: tracks catalogs and records every statement
#[derive(Default)]
pub struct RecordingSqlExecutor {
    catalogs: Mutex<Vec<String>>,
    statements: Mutex<Vec<(String, String)>>,
    in_use: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
}

impl RecordingSqlExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(self, name: &str) -> Self {
        self.catalogs.lock().unwrap().push(name.to_string());
        self
    }

    /// Catalogs that still have sessions attached and cannot be dropped
    pub fn hold_open(&self, name: &str) {
        self.in_use.lock().unwrap().push(name.to_string());
    }

    /// Fail any execute whose text contains `needle`
    pub fn fail_on(&self, needle: &str) {
        *self.fail_on.lock().unwrap() = Some(needle.to_string());
    }

    pub fn catalogs(&self) -> Vec<String> {
        self.catalogs.lock().unwrap().clone()
    }

    /// Executed statements as `(catalog, sql)` pairs, probes excluded
    pub fn statements(&self) -> Vec<(String, String)> {
        self.statements.lock().unwrap().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.statements()
            .iter()
            .filter(|(_, sql)| sql.contains(needle))
            .count()
    }
}

fn bracketed(sql: &str) -> Option<String> {
    let start = sql.find('[')?;
    let end = sql[start..].find(']')?;
    Some(sql[start + 1..start + end].to_string())
}

fn literal(sql: &str) -> Option<String> {
    let start = sql.find("name = '")? + "name = '".len();
    let end = sql[start..].find('\'')?;
    Some(sql[start..start + end].to_string())
}

#[async_trait]
impl SqlExecutor for RecordingSqlExecutor {
    async fn query_scalar(
        &self,
        _endpoint: &ConnectionEndpoint,
        sql: &str,
    ) -> Result<Option<String>> {
        let exists = literal(sql)
            .map(|name| self.catalogs.lock().unwrap().contains(&name))
            .unwrap_or(false);
        Ok(Some(if exists { "true" } else { "false" }.to_string()))
    }

    async fn execute(&self, endpoint: &ConnectionEndpoint, sql: &str) -> Result<()> {
        self.statements
            .lock()
            .unwrap()
            .push((endpoint.catalog().to_string(), sql.to_string()));

        if let Some(needle) = self.fail_on.lock().unwrap().as_deref() {
            if sql.contains(needle) {
                return Err(ProvisionError::SqlExecution {
                    catalog: endpoint.catalog().to_string(),
                    reason: format!("Incorrect syntax near '{}'", needle),
                });
            }
        }

        if sql.starts_with("CREATE DATABASE") {
            if let Some(name) = bracketed(sql) {
                self.catalogs.lock().unwrap().push(name);
            }
        } else if sql.contains("DROP DATABASE") {
            if let Some(name) = bracketed(sql) {
                if self.in_use.lock().unwrap().contains(&name) {
                    return Err(ProvisionError::SqlExecution {
                        catalog: endpoint.catalog().to_string(),
                        reason: format!(
                            "Cannot drop database \"{}\" because it is currently in use.",
                            name
                        ),
                    });
                }
                self.catalogs.lock().unwrap().retain(|c| c != &name);
            }
        }
        Ok(())
    }
}
