//! Redaction wrapper for credentials
//!
//! The SA password and every rendered connection string pass through
//! `Debug`-formatted config dumps and error messages. Wrapping them in
//! [`Sensitive`] keeps them out of log output without changing how they are
//! loaded or compared.

use serde::Deserialize;
use std::fmt;

/// Placeholder printed instead of a wrapped value
pub const REDACTED: &str = "***REDACTED***";

/// A value that never shows up in `Debug` or `Display` output
///
/// ```
/// use dbfixture_core_types::Sensitive;
///
/// let password = Sensitive::new("1q2w3e4r5t_".to_string());
/// assert_eq!(format!("{:?}", password), "***REDACTED***");
/// assert_eq!(password.expose(), "1q2w3e4r5t_");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// The wrapped value, for handing to the process or driver that needs it
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl Sensitive<String> {
    /// Replace every occurrence of the secret in `text` with the placeholder
    ///
    /// Engine CLIs sometimes echo their arguments back in error output.
    pub fn scrub(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        text.replace(self.0.as_str(), REDACTED)
    }
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}
