//! Container orchestration
//!
//! Launches a disposable SQL Server container through the engine CLI, polls
//! its logs until the image's readiness marker appears, and resolves the
//! address clients should connect to.
//!
//! Linux images are reached through the published host port on loopback.
//! Windows images do not support loopback access to published ports, so the
//! container's own IPv4 address is read from `ipconfig` inside it.

use crate::pool::WorkerPool;
use dbfixture_core::config::{ContainerSettings, Platform};
use dbfixture_core::errors::{ProvisionError, Result};
use dbfixture_core::readiness::ReadinessDetector;
use dbfixture_core::schema::{OP_CREATE_CONTAINER, OP_STOP_CONTAINER};
use dbfixture_core::{endpoint, log_op_end, log_op_error, log_op_start, PortAllocator};
use dbfixture_store::{CommandOutput, CommandRunner, CommandSpec};
use std::sync::Arc;
use std::time::Instant;

pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// A launched container and where to reach it
///
/// An empty `id` means no container is active; it is a valid state, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerHandle {
    pub id: String,
    /// Address clients connect to; empty when it could not be resolved
    pub host: String,
    /// Published host port, `None` when clients connect to `host` directly
    pub port: Option<u16>,
    /// Whether the readiness marker was seen before the poll ceiling
    pub ready: bool,
    /// Log polls performed
    pub attempts: u32,
}

impl ContainerHandle {
    pub fn is_active(&self) -> bool {
        !self.id.is_empty()
    }

    /// `host` or `host,port`
    pub fn data_source(&self) -> String {
        endpoint::data_source(&self.host, self.port)
    }
}

/// Drives the container engine CLI
pub struct ContainerOrchestrator {
    runner: Arc<dyn CommandRunner>,
    pool: WorkerPool,
    ports: PortAllocator,
    settings: ContainerSettings,
    tracked: Option<String>,
}

impl ContainerOrchestrator {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        ports: PortAllocator,
        settings: ContainerSettings,
    ) -> Self {
        Self {
            runner,
            pool: WorkerPool::default(),
            ports,
            settings,
            tracked: None,
        }
    }

    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    /// Treat `id` as the previously launched container
    pub fn track(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.tracked = if id.is_empty() { None } else { Some(id) };
    }

    pub fn tracked(&self) -> Option<&str> {
        self.tracked.as_deref()
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    fn engine(&self) -> CommandSpec {
        CommandSpec::new(&self.settings.engine)
    }

    pub fn run_command(&self, platform: Platform, host_port: u16) -> CommandSpec {
        self.engine()
            .args(["run", "--rm", "-d"])
            .arg("-e")
            .arg(format!("SA_PASSWORD={}", self.settings.sa_password.expose()))
            .args(["-e", "ACCEPT_EULA=Y"])
            .arg("-p")
            .arg(format!("{}:{}", host_port, self.settings.internal_port))
            .arg(self.settings.image(platform))
    }

    pub fn stop_command(&self, id: &str) -> CommandSpec {
        self.engine().args(["stop", id])
    }

    pub fn logs_command(&self, id: &str) -> CommandSpec {
        self.engine().args(["logs", id])
    }

    pub fn ipconfig_command(&self, id: &str) -> CommandSpec {
        self.engine().args(["exec", id, "ipconfig"])
    }

    /// Launch a fresh container for `platform`
    ///
    /// The previously tracked container is stopped concurrently with the
    /// launch; that stop is best-effort. Running out of poll attempts is not
    /// an error: the handle comes back with `ready == false`.
    ///
    /// # Errors
    ///
    /// Fails when a command cannot be spawned or when `run` exits non-zero.
    pub async fn create(&mut self, platform: Platform) -> Result<ContainerHandle> {
        let start = Instant::now();
        log_op_start!(OP_CREATE_CONTAINER, platform = platform.as_str());

        let result = self.create_inner(platform).await;
        match &result {
            Ok(handle) => log_op_end!(
                OP_CREATE_CONTAINER,
                started = start,
                container_id = handle.id.as_str(),
                host = handle.host.as_str(),
                ready = handle.ready,
                attempts = handle.attempts
            ),
            Err(err) => log_op_error!(OP_CREATE_CONTAINER, err, started = start),
        }
        result
    }

    async fn create_inner(&mut self, platform: Platform) -> Result<ContainerHandle> {
        let host_port = self.ports.allocate();

        let stop_task = match self.tracked.take() {
            Some(previous) => {
                let runner = self.runner.clone();
                let spec = self.stop_command(&previous);
                Some(
                    self.pool
                        .spawn(async move { runner.run(&spec).await?.check(&spec) })
                        .await?,
                )
            }
            None => None,
        };

        let runner = self.runner.clone();
        let run_spec = self.run_command(platform, host_port);
        let spec = run_spec.clone();
        let run_task = self
            .pool
            .spawn(async move { runner.run(&spec).await })
            .await?;

        if let Some(task) = stop_task {
            if let Err(err) = task.join().await.and_then(|stopped| stopped) {
                tracing::warn!(error = %err, "Ignoring failure to stop previous container");
            }
        }
        let output = run_task
            .join()
            .await??
            .check(&run_spec)
            .map_err(|err| self.scrub(err))?;

        let id = output.last_line().to_string();
        self.track(id.clone());

        let detector = platform.detector();
        let (ready, attempts) = if id.is_empty() {
            // No container to read logs from or exec into.
            tracing::warn!(platform = %platform, "Container engine returned no container id");
            (false, 0)
        } else {
            self.wait_until_ready(&id, platform, detector.as_ref()).await?
        };

        let (host, port) = match platform {
            Platform::Linux => (LOOPBACK_HOST.to_string(), Some(host_port)),
            Platform::Windows if id.is_empty() => (String::new(), None),
            Platform::Windows => (self.resolve_address(&id, detector.as_ref()).await?, None),
        };

        Ok(ContainerHandle {
            id,
            host,
            port,
            ready,
            attempts,
        })
    }

    /// Poll `logs` until the readiness marker shows up or the ceiling is hit
    ///
    /// Returns whether the marker was seen and how many polls were made.
    async fn wait_until_ready(
        &self,
        id: &str,
        platform: Platform,
        detector: &dyn ReadinessDetector,
    ) -> Result<(bool, u32)> {
        let ceiling = self.settings.max_attempts(platform);
        let spec = self.logs_command(id);

        for attempt in 1..=ceiling {
            let output: CommandOutput = self.runner.run(&spec).await?;
            if output.is_success() && detector.is_ready(&output.combined()) {
                tracing::debug!(container_id = id, attempts = attempt, "Container is ready");
                return Ok((true, attempt));
            }
            if attempt < ceiling {
                tokio::time::sleep(self.settings.poll_interval()).await;
            }
        }

        tracing::warn!(
            container_id = id,
            attempts = ceiling,
            "Readiness marker not seen before poll ceiling; continuing"
        );
        Ok((false, ceiling))
    }

    async fn resolve_address(&self, id: &str, detector: &dyn ReadinessDetector) -> Result<String> {
        let spec = self.ipconfig_command(id);
        let output = self.runner.run(&spec).await?;
        if !output.is_success() {
            tracing::warn!(
                container_id = id,
                status = ?output.status,
                "ipconfig failed inside container"
            );
            return Ok(String::new());
        }

        let address = detector.extract_address(&output.stdout);
        if address.is_empty() {
            tracing::warn!(container_id = id, "No IPv4 address in ipconfig output");
        }
        Ok(address)
    }

    /// Engine CLIs may echo `SA_PASSWORD=...` back in their error output
    fn scrub(&self, err: ProvisionError) -> ProvisionError {
        match err {
            ProvisionError::ProcessFailed {
                command,
                status,
                stderr,
            } => ProvisionError::ProcessFailed {
                command,
                status,
                stderr: self.settings.sa_password.scrub(&stderr),
            },
            other => other,
        }
    }

    /// Stop container `id`; an empty id is a no-op
    ///
    /// # Errors
    ///
    /// A non-zero exit from the engine is returned as `ProcessFailed` and is
    /// not retried.
    pub async fn stop(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Ok(());
        }

        let start = Instant::now();
        log_op_start!(OP_STOP_CONTAINER, container_id = id);

        let spec = self.stop_command(id);
        let result = match self.runner.run(&spec).await {
            Ok(output) => output.check(&spec).map(|_| ()),
            Err(err) => Err(err),
        };
        match &result {
            Ok(()) => log_op_end!(OP_STOP_CONTAINER, started = start, container_id = id),
            Err(err) => log_op_error!(OP_STOP_CONTAINER, err, started = start),
        }
        result
    }
}
