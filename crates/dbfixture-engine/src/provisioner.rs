//! Provisioner facade
//!
//! State machine over one disposable catalog:
//!
//! ```text
//! Uninitialized --initialize--> BackendSelected --provisioned--> Provisioned
//!                                      |                              |
//!                                      +-----------teardown-----------+--> Destroyed
//! ```
//!
//! Configuration is read once, when `initialize` first runs. Teardown works
//! from the backend recorded at that point and never consults the source
//! again, so a source that changes mid-run cannot redirect teardown at a
//! backend that was never created.

use crate::container::{ContainerHandle, ContainerOrchestrator};
use dbfixture_core::config::{BackendKind, ConfigSource, LayeredConfigSource, ProvisioningConfig};
use dbfixture_core::endpoint::{
    self, CONTAINER_DATABASE, CONTAINER_MASTER, LOCAL_DATABASE, LOCAL_MASTER,
};
use dbfixture_core::errors::{ProvisionError, Result};
use dbfixture_core::schema::{OP_INITIALIZE, OP_TEARDOWN};
use dbfixture_core::{log_op_end, log_op_error, log_op_start, ConnectionEndpoint, PortAllocator};
use dbfixture_core_types::RunId;
use dbfixture_store::scripts::apply_scripts;
use dbfixture_store::{
    CommandRunner, LocalInstanceManager, ProcessRunner, SqlExecutor, SqlcmdExecutor,
};
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::Instrument;

/// Lifecycle state of a [`Provisioner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionerState {
    Uninitialized,
    /// Configuration captured; the backend may be partially provisioned
    BackendSelected,
    Provisioned,
    Destroyed,
}

impl ProvisionerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionerState::Uninitialized => "uninitialized",
            ProvisionerState::BackendSelected => "backend selected",
            ProvisionerState::Provisioned => "provisioned",
            ProvisionerState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for ProvisionerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, read-mostly handle through which test code picks up the endpoint
#[derive(Debug, Clone, Default)]
pub struct EndpointSlot {
    inner: Arc<RwLock<Option<ConnectionEndpoint>>>,
}

impl EndpointSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The published endpoint, if provisioning has completed
    pub fn get(&self) -> Option<ConnectionEndpoint> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_published(&self) -> bool {
        self.get().is_some()
    }

    fn publish(&self, endpoint: ConnectionEndpoint) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(endpoint),
            Err(poisoned) => *poisoned.into_inner() = Some(endpoint),
        }
    }

    fn clear(&self) {
        match self.inner.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

/// The backend created by `initialize`
enum ActiveBackend {
    Local {
        catalog: String,
        admin: ConnectionEndpoint,
    },
    Container {
        handle: ContainerHandle,
        orchestrator: ContainerOrchestrator,
    },
}

/// Everything captured at initialize and consulted at teardown
struct ProvisionerContext {
    state: ProvisionerState,
    config: Option<ProvisioningConfig>,
    backend: Option<ActiveBackend>,
    endpoint: Option<ConnectionEndpoint>,
}

/// Stands up and tears down one disposable catalog
pub struct Provisioner {
    source: Box<dyn ConfigSource>,
    runner: Arc<dyn CommandRunner>,
    executor: Option<Arc<dyn SqlExecutor>>,
    ports: Option<PortAllocator>,
    context: ProvisionerContext,
    slot: EndpointSlot,
    run_id: RunId,
}

impl Provisioner {
    /// A provisioner reading its configuration from `source`
    ///
    /// SQL goes through `sqlcmd` on `runner` unless an executor is supplied
    /// with [`Provisioner::with_sql_executor`].
    pub fn new(source: Box<dyn ConfigSource>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            source,
            runner,
            executor: None,
            ports: None,
            context: ProvisionerContext {
                state: ProvisionerState::Uninitialized,
                config: None,
                backend: None,
                endpoint: None,
            },
            slot: EndpointSlot::new(),
            run_id: RunId::new(),
        }
    }

    /// Layered file/`.env`/environment configuration with real processes
    pub fn from_environment() -> Self {
        Self::new(
            Box::new(LayeredConfigSource::new()),
            Arc::new(ProcessRunner::new()),
        )
    }

    pub fn with_sql_executor(mut self, executor: Arc<dyn SqlExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_port_allocator(mut self, ports: PortAllocator) -> Self {
        self.ports = Some(ports);
        self
    }

    /// Publish into an existing slot instead of a private one
    pub fn with_endpoint_slot(mut self, slot: EndpointSlot) -> Self {
        self.slot = slot;
        self
    }

    pub fn state(&self) -> ProvisionerState {
        self.context.state
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Configuration captured by `initialize`
    pub fn config(&self) -> Option<&ProvisioningConfig> {
        self.context.config.as_ref()
    }

    pub fn endpoint(&self) -> Option<&ConnectionEndpoint> {
        self.context.endpoint.as_ref()
    }

    pub fn endpoint_slot(&self) -> EndpointSlot {
        self.slot.clone()
    }

    /// The container handle, when the container backend is active
    pub fn container(&self) -> Option<&ContainerHandle> {
        match &self.context.backend {
            Some(ActiveBackend::Container { handle, .. }) => Some(handle),
            _ => None,
        }
    }

    /// Provision the configured backend and publish its endpoint
    ///
    /// Calling this again once provisioned returns the same endpoint.
    ///
    /// # Errors
    ///
    /// `InvalidState` after teardown; otherwise configuration, process and
    /// SQL failures propagate.
    pub async fn initialize(&mut self) -> Result<ConnectionEndpoint> {
        let span = tracing::info_span!("provisioner", run_id = %self.run_id);
        async {
            let start = Instant::now();
            log_op_start!(OP_INITIALIZE);

            let result = self.initialize_inner().await;
            match &result {
                Ok(endpoint) => log_op_end!(
                    OP_INITIALIZE,
                    started = start,
                    data_source = endpoint.data_source(),
                    catalog = endpoint.catalog()
                ),
                Err(err) => log_op_error!(OP_INITIALIZE, err, started = start),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn initialize_inner(&mut self) -> Result<ConnectionEndpoint> {
        match self.context.state {
            ProvisionerState::Provisioned => {
                if let Some(endpoint) = &self.context.endpoint {
                    return Ok(endpoint.clone());
                }
            }
            ProvisionerState::Destroyed => {
                return Err(self.invalid_state(OP_INITIALIZE));
            }
            ProvisionerState::Uninitialized => {
                let config = self.source.load()?;
                tracing::info!(
                    backend = %config.backend,
                    platform = %config.platform,
                    catalog = %config.catalog,
                    "Backend selected"
                );
                self.context.config = Some(config);
                self.context.state = ProvisionerState::BackendSelected;
            }
            ProvisionerState::BackendSelected => {}
        }

        let config = self
            .context
            .config
            .clone()
            .ok_or_else(|| self.invalid_state(OP_INITIALIZE))?;

        let endpoint = match config.backend {
            BackendKind::Local => self.provision_local(&config).await?,
            BackendKind::Container => self.provision_container(&config).await?,
        };

        if let Some(endpoint) = &endpoint {
            if !config.seed_scripts.is_empty() {
                let executor = self.executor();
                let batches =
                    apply_scripts(executor.as_ref(), endpoint, config.seed_scripts.as_slice())
                        .await?;
                tracing::info!(batches, "Seed scripts applied");
            }
        }

        let endpoint = match endpoint {
            Some(endpoint) => endpoint,
            None => self.unreachable_endpoint(&config),
        };
        self.slot.publish(endpoint.clone());
        self.context.endpoint = Some(endpoint.clone());
        self.context.state = ProvisionerState::Provisioned;
        Ok(endpoint)
    }

    async fn provision_local(
        &mut self,
        config: &ProvisioningConfig,
    ) -> Result<Option<ConnectionEndpoint>> {
        let server = &config.local.server;
        let admin = endpoint::build(LOCAL_MASTER, server, None, &config.catalog);
        let manager = LocalInstanceManager::new(self.executor(), admin.clone());

        if config.fresh_catalog {
            manager.delete(&config.catalog, &admin).await?;
        }
        manager.create(&config.catalog).await?;

        self.context.backend = Some(ActiveBackend::Local {
            catalog: config.catalog.clone(),
            admin,
        });
        Ok(Some(endpoint::build(
            LOCAL_DATABASE,
            server,
            None,
            &config.catalog,
        )))
    }

    /// Returns `None` when the container's address could not be resolved
    async fn provision_container(
        &mut self,
        config: &ProvisioningConfig,
    ) -> Result<Option<ConnectionEndpoint>> {
        let settings = config.container.clone();
        let password = settings.sa_password.expose().clone();

        let mut orchestrator = match self.context.backend.take() {
            // Retry after a partial initialize: the earlier container is
            // stopped alongside the new launch.
            Some(ActiveBackend::Container {
                handle,
                mut orchestrator,
            }) => {
                if handle.is_active() {
                    orchestrator.track(handle.id);
                }
                orchestrator
            }
            _ => ContainerOrchestrator::new(
                self.runner.clone(),
                self.ports.take().unwrap_or_default(),
                settings.clone(),
            ),
        };

        let created = orchestrator.create(config.platform).await;
        let handle = match created {
            Ok(handle) => handle,
            Err(err) => {
                // A container launched before the failure is still tracked.
                let handle = ContainerHandle {
                    id: orchestrator.tracked().unwrap_or_default().to_string(),
                    ..ContainerHandle::default()
                };
                self.context.backend = Some(ActiveBackend::Container {
                    handle,
                    orchestrator,
                });
                return Err(err);
            }
        };
        self.context.backend = Some(ActiveBackend::Container {
            handle: handle.clone(),
            orchestrator,
        });

        if handle.host.is_empty() {
            tracing::warn!(
                container_id = handle.id.as_str(),
                "Container address unresolved; catalog not created"
            );
            return Ok(None);
        }

        if settings.create_catalog {
            let admin = endpoint::build_with_password(
                CONTAINER_MASTER,
                &handle.host,
                handle.port,
                &config.catalog,
                &password,
            );
            LocalInstanceManager::new(self.executor(), admin)
                .create(&config.catalog)
                .await?;
        }

        Ok(Some(endpoint::build_with_password(
            CONTAINER_DATABASE,
            &handle.host,
            handle.port,
            &config.catalog,
            &password,
        )))
    }

    /// Endpoint published when no address was resolved; its data source is
    /// empty so consumers fail at connect time
    fn unreachable_endpoint(&self, config: &ProvisioningConfig) -> ConnectionEndpoint {
        endpoint::build_with_password(
            CONTAINER_DATABASE,
            "",
            None,
            &config.catalog,
            config.container.sa_password.expose(),
        )
    }

    /// Release the backend created by `initialize`
    ///
    /// A second teardown is a no-op.
    ///
    /// # Errors
    ///
    /// `InvalidState` before `initialize`. Failures to drop the catalog or
    /// stop the container propagate and leave the provisioner in its current
    /// state so teardown can be retried.
    pub async fn teardown(&mut self) -> Result<()> {
        let span = tracing::info_span!("provisioner", run_id = %self.run_id);
        async {
            let start = Instant::now();
            log_op_start!(OP_TEARDOWN);

            let result = self.teardown_inner().await;
            match &result {
                Ok(()) => log_op_end!(OP_TEARDOWN, started = start),
                Err(err) => log_op_error!(OP_TEARDOWN, err, started = start),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn teardown_inner(&mut self) -> Result<()> {
        match self.context.state {
            ProvisionerState::Uninitialized => return Err(self.invalid_state(OP_TEARDOWN)),
            ProvisionerState::Destroyed => return Ok(()),
            ProvisionerState::BackendSelected | ProvisionerState::Provisioned => {}
        }

        match &self.context.backend {
            Some(ActiveBackend::Local { catalog, admin }) => {
                LocalInstanceManager::new(self.executor(), admin.clone())
                    .delete(catalog, admin)
                    .await?;
            }
            Some(ActiveBackend::Container {
                handle,
                orchestrator,
            }) => {
                orchestrator.stop(&handle.id).await?;
            }
            None => {}
        }

        self.context.backend = None;
        self.context.endpoint = None;
        self.slot.clear();
        self.context.state = ProvisionerState::Destroyed;
        Ok(())
    }

    fn executor(&self) -> Arc<dyn SqlExecutor> {
        match &self.executor {
            Some(executor) => executor.clone(),
            None => {
                let program = self
                    .context
                    .config
                    .as_ref()
                    .map(|config| config.local.sqlcmd.clone())
                    .unwrap_or_else(|| "sqlcmd".to_string());
                Arc::new(SqlcmdExecutor::with_program(self.runner.clone(), program))
            }
        }
    }

    fn invalid_state(&self, op: &str) -> ProvisionError {
        ProvisionError::InvalidState {
            op: op.to_string(),
            state: self.context.state.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_publish_and_clear() {
        let slot = EndpointSlot::new();
        let reader = slot.clone();
        assert!(!reader.is_published());

        slot.publish(endpoint::build(LOCAL_DATABASE, "(local)", None, "SampleDB"));
        assert_eq!(reader.get().map(|e| e.catalog().to_string()).as_deref(), Some("SampleDB"));

        slot.clear();
        assert!(reader.get().is_none());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(ProvisionerState::BackendSelected.to_string(), "backend selected");
        assert_eq!(ProvisionerState::Destroyed.as_str(), "destroyed");
    }
}
