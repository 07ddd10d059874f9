use dbfixture_core_types::schema::{OP_DROP_CATALOG, OP_LOAD_CONFIG};
use thiserror::Error;

/// Result type alias using ProvisionError
pub type Result<T> = std::result::Result<T, ProvisionError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that tests and log consumers can
/// match on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Configuration
    InvalidInput,
    Config,

    // External processes
    ExternalProcess,
    ProcessSpawn,

    // SQL engine
    SqlExecution,
    CatalogInUse,

    // Lifecycle
    InvalidState,
    Concurrency,

    // Filesystem
    Io,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::ExternalProcess => "ERR_EXTERNAL_PROCESS",
            ExErrorKind::ProcessSpawn => "ERR_PROCESS_SPAWN",
            ExErrorKind::SqlExecution => "ERR_SQL_EXECUTION",
            ExErrorKind::CatalogInUse => "ERR_CATALOG_IN_USE",
            ExErrorKind::InvalidState => "ERR_INVALID_STATE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Io => "ERR_IO",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling plus context
/// (operation, the container or catalog involved, exit code) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    exit_code: Option<i32>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            exit_code: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (container id, catalog name, config key)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add process exit code context
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the process exit code, if any
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(code) = self.exit_code {
            write!(f, " (exit_code: {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for provisioning operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProvisionError {
    // ===== Configuration =====
    /// Configuration could not be loaded or deserialized
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// A configuration key holds a value outside its allowed set
    #[error("Unsupported value '{value}' for {key}; expected one of {expected}")]
    UnsupportedValue {
        key: String,
        value: String,
        expected: String,
    },

    // ===== External processes =====
    /// The program could not be started at all
    #[error("Failed to spawn '{program}': {reason}")]
    ProcessSpawn { program: String, reason: String },

    /// The program ran and reported failure
    #[error("'{command}' exited with status {status:?}: {stderr}")]
    ProcessFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    // ===== SQL engine =====
    /// A statement against the engine failed
    #[error("SQL execution failed on catalog '{catalog}': {reason}")]
    SqlExecution { catalog: String, reason: String },

    /// The catalog still has sessions attached and cannot be dropped
    #[error("Catalog '{catalog}' is currently in use")]
    CatalogInUse { catalog: String },

    // ===== Lifecycle =====
    /// Operation called in a state that does not allow it
    #[error("Cannot {op} while provisioner is {state}")]
    InvalidState { op: String, state: String },

    /// A pooled task could not be scheduled or joined
    #[error("Worker pool failure: {reason}")]
    WorkerPool { reason: String },

    // ===== IO =====
    /// Filesystem access failed
    #[error("IO error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl From<ProvisionError> for ExError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Config { reason } => ExError::new(ExErrorKind::Config)
                .with_op(OP_LOAD_CONFIG)
                .with_message(reason),

            ProvisionError::UnsupportedValue {
                key,
                value,
                expected,
            } => ExError::new(ExErrorKind::InvalidInput)
                .with_op(OP_LOAD_CONFIG)
                .with_entity_id(key)
                .with_message(format!("'{}' is not one of {}", value, expected)),

            ProvisionError::ProcessSpawn { program, reason } => {
                ExError::new(ExErrorKind::ProcessSpawn)
                    .with_entity_id(program)
                    .with_message(reason)
            }

            ProvisionError::ProcessFailed {
                command,
                status,
                stderr,
            } => {
                let ex = ExError::new(ExErrorKind::ExternalProcess)
                    .with_entity_id(command)
                    .with_message(stderr);
                match status {
                    Some(code) => ex.with_exit_code(code),
                    None => ex,
                }
            }

            ProvisionError::SqlExecution { catalog, reason } => {
                ExError::new(ExErrorKind::SqlExecution)
                    .with_entity_id(catalog)
                    .with_message(reason)
            }

            ProvisionError::CatalogInUse { catalog } => ExError::new(ExErrorKind::CatalogInUse)
                .with_op(OP_DROP_CATALOG)
                .with_entity_id(catalog)
                .with_message("Catalog still has active sessions"),

            ProvisionError::InvalidState { op, state } => ExError::new(ExErrorKind::InvalidState)
                .with_op(op)
                .with_message(format!("Provisioner is {}", state)),

            ProvisionError::WorkerPool { reason } => {
                ExError::new(ExErrorKind::Concurrency).with_message(reason)
            }

            ProvisionError::Io { path, reason } => ExError::new(ExErrorKind::Io)
                .with_entity_id(path)
                .with_message(reason),
        }
    }
}

impl ProvisionError {
    /// Build an `Io` error for the given path
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        ProvisionError::Io {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for ProvisionError {
    fn from(err: config::ConfigError) -> Self {
        ProvisionError::Config {
            reason: err.to_string(),
        }
    }
}
