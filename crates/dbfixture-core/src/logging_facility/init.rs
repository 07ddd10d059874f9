//! Subscriber installation

use std::sync::Once;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Crates whose events the default filters let through
const CRATES: [&str; 3] = ["dbfixture_core", "dbfixture_store", "dbfixture_engine"];

/// Environment variable overriding the profile's default filter
pub const FILTER_ENV: &str = "DBFIXTURE_LOG";

/// Output profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable, debug level, routed through libtest's output capture
    Development,
    /// JSON lines at info level for CI log collectors
    Production,
    /// Bare registry; pair with `init_test_capture()`
    Test,
}

impl Profile {
    pub fn default_level(&self) -> &'static str {
        match self {
            Profile::Development => "debug",
            Profile::Production | Profile::Test => "info",
        }
    }

    /// `crate=level` directives for every dbfixture crate
    pub fn default_filter(&self) -> String {
        CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, self.default_level()))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(FILTER_ENV)
            .unwrap_or_else(|_| EnvFilter::new(self.default_filter()))
    }
}

static INIT: Once = Once::new();

/// Install the global subscriber for `profile`
///
/// Only the first call has any effect. If another subscriber is already
/// installed (a test harness, say) it is left in place.
pub fn init(profile: Profile) {
    INIT.call_once(|| {
        let installed = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(profile.filter())
                .with_test_writer()
                .try_init()
                .is_ok(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(profile.filter())
                .try_init()
                .is_ok(),
            Profile::Test => tracing_subscriber::registry().try_init().is_ok(),
        };
        if !installed {
            tracing::debug!("Global subscriber already installed; keeping it");
        }
    });
}
