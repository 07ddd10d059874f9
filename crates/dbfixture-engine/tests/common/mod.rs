//! Fakes shared by the engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use dbfixture_core::config::{ConfigSource, ContainerSettings, Platform, ProvisioningConfig};
use dbfixture_core::readiness::{LINUX_READY_MARKER, WINDOWS_READY_MARKER};
use dbfixture_core::{ConnectionEndpoint, ProvisionError, Result};
use dbfixture_store::{CommandOutput, CommandRunner, CommandSpec, SqlExecutor};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

pub const HOST_PORT: u16 = 50123;

pub const WINDOWS_IPCONFIG: &str = "\r\nWindows IP Configuration\r\n\r\n\r\nEthernet adapter vEthernet (Ethernet):\r\n\r\n   Connection-specific DNS Suffix  . : \r\n   IPv4 Address. . . . . . . . . . . : 172.24.103.58\r\n   Subnet Mask . . . . . . . . . . . : 255.255.240.0\r\n";

/// Scripted stand-in for the container engine CLI
pub struct FakeDocker {
    platform: Platform,
    ids: Mutex<VecDeque<String>>,
    run_status: Mutex<i32>,
    ready_after: Mutex<Option<u32>>,
    log_polls: Mutex<HashMap<String, u32>>,
    ipconfig: Mutex<CommandOutput>,
    failing_stops: Mutex<Vec<String>>,
    failing_logs: Mutex<u32>,
    rendezvous: Mutex<Option<Arc<Barrier>>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeDocker {
    /// Hands out `abc123`, then `def456`; ready on the first log poll
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            ids: Mutex::new(VecDeque::from(vec![
                "abc123".to_string(),
                "def456".to_string(),
            ])),
            run_status: Mutex::new(0),
            ready_after: Mutex::new(Some(1)),
            log_polls: Mutex::new(HashMap::new()),
            ipconfig: Mutex::new(CommandOutput::success(WINDOWS_IPCONFIG)),
            failing_stops: Mutex::new(Vec::new()),
            failing_logs: Mutex::new(0),
            rendezvous: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Marker appears on the `polls`-th log fetch; `None` never
    pub fn ready_after(self, polls: Option<u32>) -> Self {
        *self.ready_after.lock().unwrap() = polls;
        self
    }

    pub fn with_ids(self, ids: &[&str]) -> Self {
        *self.ids.lock().unwrap() = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn run_fails(self, status: i32) -> Self {
        *self.run_status.lock().unwrap() = status;
        self
    }

    pub fn ipconfig(self, output: CommandOutput) -> Self {
        *self.ipconfig.lock().unwrap() = output;
        self
    }

    pub fn stop_fails(self, id: &str) -> Self {
        self.failing_stops.lock().unwrap().push(id.to_string());
        self
    }

    /// The next `times` log fetches fail to spawn
    pub fn logs_unavailable(self, times: u32) -> Self {
        *self.failing_logs.lock().unwrap() = times;
        self
    }

    /// `stop` and `run` both wait on `barrier` before answering
    pub fn rendezvous(self, barrier: Arc<Barrier>) -> Self {
        *self.rendezvous.lock().unwrap() = Some(barrier);
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls for one subcommand, as argument vectors
    pub fn calls_to(&self, subcommand: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|spec| spec.subcommand() == Some(subcommand))
            .map(|spec| spec.get_args().to_vec())
            .collect()
    }

    fn starting_log(&self) -> &'static str {
        match self.platform {
            Platform::Linux => "Starting up database 'master'.\nRecovery is complete.",
            Platform::Windows => "VERBOSE: Starting SQL Server",
        }
    }

    fn ready_log(&self) -> String {
        let marker = match self.platform {
            Platform::Linux => LINUX_READY_MARKER,
            Platform::Windows => WINDOWS_READY_MARKER,
        };
        format!("{}\n{}.", self.starting_log(), marker)
    }

    fn logs(&self, id: &str) -> CommandOutput {
        let mut polls = self.log_polls.lock().unwrap();
        let count = polls.entry(id.to_string()).or_insert(0);
        *count += 1;
        match *self.ready_after.lock().unwrap() {
            Some(after) if *count >= after => CommandOutput::success(self.ready_log()),
            _ => CommandOutput::success(self.starting_log()),
        }
    }

    async fn meet(&self) {
        let barrier = self.rendezvous.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
    }
}

#[async_trait]
impl CommandRunner for FakeDocker {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        let args = spec.get_args();
        let target = args.get(1).cloned().unwrap_or_default();

        let output = match spec.subcommand() {
            Some("run") => {
                self.meet().await;
                let status = *self.run_status.lock().unwrap();
                if status != 0 {
                    CommandOutput::failure(
                        status,
                        format!("docker: invalid argument {:?}", args),
                    )
                } else {
                    let id = self.ids.lock().unwrap().pop_front().unwrap_or_default();
                    CommandOutput::success(format!("{}\n", id))
                }
            }
            Some("stop") => {
                self.meet().await;
                if self.failing_stops.lock().unwrap().contains(&target) {
                    CommandOutput::failure(1, format!("Error: No such container: {}", target))
                } else {
                    CommandOutput::success(format!("{}\n", target))
                }
            }
            Some("logs") => {
                let mut failing = self.failing_logs.lock().unwrap();
                if *failing > 0 {
                    *failing -= 1;
                    return Err(ProvisionError::ProcessSpawn {
                        program: spec.program().to_string(),
                        reason: "connection to engine daemon refused".to_string(),
                    });
                }
                drop(failing);
                self.logs(&target)
            }
            Some("exec") => self.ipconfig.lock().unwrap().clone(),
            _ => CommandOutput::failure(127, "unknown command"),
        };
        Ok(output)
    }
}

/// In-memory engine recording statements
#[derive(Default)]
pub struct FakeSql {
    catalogs: Mutex<Vec<String>>,
    statements: Mutex<Vec<(String, String, String)>>,
}

impl FakeSql {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(self, name: &str) -> Self {
        self.catalogs.lock().unwrap().push(name.to_string());
        self
    }

    pub fn catalogs(&self) -> Vec<String> {
        self.catalogs.lock().unwrap().clone()
    }

    /// `(data_source, catalog, sql)` for every executed statement
    pub fn statements(&self) -> Vec<(String, String, String)> {
        self.statements.lock().unwrap().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.statements()
            .iter()
            .filter(|(_, _, sql)| sql.contains(needle))
            .count()
    }
}

fn bracketed(sql: &str) -> Option<String> {
    let start = sql.find('[')?;
    let end = sql[start..].find(']')?;
    Some(sql[start + 1..start + end].to_string())
}

#[async_trait]
impl SqlExecutor for FakeSql {
    async fn query_scalar(
        &self,
        _endpoint: &ConnectionEndpoint,
        sql: &str,
    ) -> Result<Option<String>> {
        let exists = self
            .catalogs
            .lock()
            .unwrap()
            .iter()
            .any(|name| sql.contains(&format!("name = '{}'", name)));
        Ok(Some(exists.to_string()))
    }

    async fn execute(&self, endpoint: &ConnectionEndpoint, sql: &str) -> Result<()> {
        self.statements.lock().unwrap().push((
            endpoint.data_source().to_string(),
            endpoint.catalog().to_string(),
            sql.to_string(),
        ));
        if sql.contains("RAISERROR") {
            return Err(ProvisionError::SqlExecution {
                catalog: endpoint.catalog().to_string(),
                reason: "raised".to_string(),
            });
        }
        if let Some(name) = bracketed(sql) {
            if sql.starts_with("CREATE DATABASE") {
                self.catalogs.lock().unwrap().push(name);
            } else if sql.contains("DROP DATABASE") {
                self.catalogs.lock().unwrap().retain(|c| c != &name);
            }
        }
        Ok(())
    }
}

/// Config source whose contents can be swapped mid-run
#[derive(Clone)]
pub struct MutableSource {
    config: Arc<Mutex<ProvisioningConfig>>,
    loads: Arc<Mutex<u32>>,
}

impl MutableSource {
    pub fn new(config: ProvisioningConfig) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
            loads: Arc::new(Mutex::new(0)),
        }
    }

    pub fn set(&self, config: ProvisioningConfig) {
        *self.config.lock().unwrap() = config;
    }

    pub fn loads(&self) -> u32 {
        *self.loads.lock().unwrap()
    }
}

impl ConfigSource for MutableSource {
    fn load(&self) -> Result<ProvisioningConfig> {
        *self.loads.lock().unwrap() += 1;
        Ok(self.config.lock().unwrap().clone())
    }
}

/// Container settings with a short poll interval for real-time tests
pub fn fast_settings() -> ContainerSettings {
    ContainerSettings {
        poll_interval_ms: 5,
        ..ContainerSettings::default()
    }
}

pub fn local_config() -> ProvisioningConfig {
    let mut config = ProvisioningConfig::local();
    config.local.server = "(local)".to_string();
    config
}

pub fn container_config(platform: Platform) -> ProvisioningConfig {
    let mut config = ProvisioningConfig::container(platform);
    config.container = fast_settings();
    config
}
