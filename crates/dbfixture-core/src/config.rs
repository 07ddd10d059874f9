//! Provisioning configuration
//!
//! The configuration is read exactly once per provisioner and then treated
//! as immutable: the value consulted by teardown is the value captured at
//! initialize, whatever the backing sources say by then.
//!
//! Layers, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. Optional TOML file (`dbfixture.toml` unless overridden)
//! 3. `.env` file in the working directory (loaded into the environment)
//! 4. Environment variables prefixed `DBFIXTURE_`, nested keys split on `__`

use crate::errors::{ProvisionError, Result};
use dbfixture_core_types::Sensitive;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "dbfixture.toml";
pub const DEFAULT_ENV_PREFIX: &str = "DBFIXTURE";
pub const DEFAULT_CATALOG: &str = "SampleDB";
pub const DEFAULT_LOCAL_SERVER: &str = r"(LocalDB)\MSSQLLocalDB";
pub const DEFAULT_SA_PASSWORD: &str = "1q2w3e4r5t_";
pub const DEFAULT_INTERNAL_PORT: u16 = 1433;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_LINUX_IMAGE: &str = "mcr.microsoft.com/mssql/server:2019-latest";
pub const DEFAULT_WINDOWS_IMAGE: &str = "microsoft/mssql-server-windows-developer";

/// Where the disposable catalog lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum BackendKind {
    /// A catalog on an already running local engine
    #[default]
    Local,
    /// A catalog on a freshly launched containerized engine
    Container,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Container => "container",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "container" => Ok(BackendKind::Container),
            _ => Err(ProvisionError::UnsupportedValue {
                key: "database_type".to_string(),
                value: s.to_string(),
                expected: "local|container".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for BackendKind {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Container image family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Platform {
    #[default]
    Linux,
    Windows,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
        }
    }

    /// Built-in readiness poll ceiling for this image family
    pub fn default_max_attempts(&self) -> u32 {
        match self {
            Platform::Linux => 30,
            Platform::Windows => 60,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            _ => Err(ProvisionError::UnsupportedValue {
                key: "container_type".to_string(),
                value: s.to_string(),
                expected: "Linux|Windows".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Settings for the local-engine backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    /// Data source of the local engine instance
    pub server: String,
    /// Command-line SQL client used to reach the engine
    pub sqlcmd: String,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            server: DEFAULT_LOCAL_SERVER.to_string(),
            sqlcmd: "sqlcmd".to_string(),
        }
    }
}

/// Settings for the container backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Container engine CLI
    pub engine: String,
    pub linux_image: String,
    pub windows_image: String,
    pub sa_password: Sensitive<String>,
    /// Port the engine listens on inside the container
    pub internal_port: u16,
    pub poll_interval_ms: u64,
    pub linux_max_attempts: u32,
    pub windows_max_attempts: u32,
    /// Create the configured catalog inside the container once it is up
    pub create_catalog: bool,
}

impl ContainerSettings {
    pub fn image(&self, platform: Platform) -> &str {
        match platform {
            Platform::Linux => &self.linux_image,
            Platform::Windows => &self.windows_image,
        }
    }

    pub fn max_attempts(&self, platform: Platform) -> u32 {
        match platform {
            Platform::Linux => self.linux_max_attempts,
            Platform::Windows => self.windows_max_attempts,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            linux_image: DEFAULT_LINUX_IMAGE.to_string(),
            windows_image: DEFAULT_WINDOWS_IMAGE.to_string(),
            sa_password: Sensitive::new(DEFAULT_SA_PASSWORD.to_string()),
            internal_port: DEFAULT_INTERNAL_PORT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            linux_max_attempts: Platform::Linux.default_max_attempts(),
            windows_max_attempts: Platform::Windows.default_max_attempts(),
            create_catalog: true,
        }
    }
}

/// Immutable provisioning configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    #[serde(rename = "database_type")]
    pub backend: BackendKind,
    #[serde(rename = "container_type")]
    pub platform: Platform,
    pub catalog: String,
    /// Drop an existing catalog before creating it
    pub fresh_catalog: bool,
    /// SQL scripts applied to the catalog after it is created, in order
    pub seed_scripts: Vec<PathBuf>,
    pub local: LocalSettings,
    pub container: ContainerSettings,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            platform: Platform::default(),
            catalog: DEFAULT_CATALOG.to_string(),
            fresh_catalog: false,
            seed_scripts: Vec::new(),
            local: LocalSettings::default(),
            container: ContainerSettings::default(),
        }
    }
}

impl ProvisioningConfig {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn container(platform: Platform) -> Self {
        Self {
            backend: BackendKind::Container,
            platform,
            ..Self::default()
        }
    }
}

/// Something the provisioner can read its configuration from
pub trait ConfigSource: Send + Sync {
    /// Read the current configuration
    fn load(&self) -> Result<ProvisioningConfig>;
}

impl ConfigSource for ProvisioningConfig {
    fn load(&self) -> Result<ProvisioningConfig> {
        Ok(self.clone())
    }
}

/// Defaults, then an optional TOML file, then `.env`, then the environment
#[derive(Debug, Clone)]
pub struct LayeredConfigSource {
    file: Option<PathBuf>,
    env_prefix: String,
    load_dotenv: bool,
}

impl Default for LayeredConfigSource {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from(DEFAULT_CONFIG_FILE)),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            load_dotenv: true,
        }
    }
}

impl LayeredConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn without_file(mut self) -> Self {
        self.file = None;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn with_dotenv(mut self, enabled: bool) -> Self {
        self.load_dotenv = enabled;
        self
    }
}

impl ConfigSource for LayeredConfigSource {
    fn load(&self) -> Result<ProvisioningConfig> {
        if self.load_dotenv {
            // A missing .env is the common case.
            let _ = dotenvy::dotenv();
        }

        let mut builder = config::Config::builder();
        if let Some(path) = &self.file {
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__"),
        );

        let settings = builder.build()?;
        let config: ProvisioningConfig = settings.try_deserialize()?;

        tracing::debug!(
            backend = %config.backend,
            platform = %config.platform,
            catalog = %config.catalog,
            "Loaded provisioning configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse_is_case_insensitive() {
        assert_eq!("LOCAL".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert_eq!(
            " Container ".parse::<BackendKind>().unwrap(),
            BackendKind::Container
        );
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = "remote".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, ProvisionError::UnsupportedValue { ref key, .. } if key == "database_type"));
    }

    #[test]
    fn test_platform_parse_and_ceilings() {
        assert_eq!("Windows".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("linux".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!(Platform::Linux.default_max_attempts(), 30);
        assert_eq!(Platform::Windows.default_max_attempts(), 60);
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ProvisioningConfig::default();
        assert_eq!(config.backend, BackendKind::Local);
        assert_eq!(config.platform, Platform::Linux);
        assert_eq!(config.catalog, "SampleDB");
        assert_eq!(config.container.internal_port, 1433);
        assert_eq!(config.container.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.container.max_attempts(Platform::Windows), 60);
    }

    #[test]
    fn test_debug_output_redacts_password() {
        let config = ProvisioningConfig::container(Platform::Linux);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(DEFAULT_SA_PASSWORD));
    }
}
