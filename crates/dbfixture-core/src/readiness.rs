//! Readiness detection over unstructured server output
//!
//! The containerized engines give no health endpoint, so readiness is read
//! off the accumulated log text: each image family prints a fixed line once
//! start-up has finished. Windows images additionally need the container's
//! internal address, which is scraped from `ipconfig` output.

use crate::config::Platform;
use std::net::Ipv4Addr;

/// Marker printed by the Linux image once locale and full-text setup is done
pub const LINUX_READY_MARKER: &str =
    "The default language (LCID 0) has been set for engine and full-text services";

/// Marker printed by the Windows image's start script
pub const WINDOWS_READY_MARKER: &str = "VERBOSE: Started SQL Server";

/// Inspects server output for a readiness signal
pub trait ReadinessDetector: Send + Sync {
    /// Whether `log_text` shows the server has finished starting
    fn is_ready(&self, log_text: &str) -> bool;

    /// Extract the server address from exec output; empty when absent
    fn extract_address(&self, _exec_output: &str) -> String {
        String::new()
    }
}

/// Detector for the Linux image family
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxReadiness;

impl ReadinessDetector for LinuxReadiness {
    fn is_ready(&self, log_text: &str) -> bool {
        log_text.contains(LINUX_READY_MARKER)
    }
}

/// Detector for the Windows image family
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsReadiness;

impl ReadinessDetector for WindowsReadiness {
    fn is_ready(&self, log_text: &str) -> bool {
        log_text.contains(WINDOWS_READY_MARKER)
    }

    /// Scans `ipconfig` output for `IPv4 Address. . . : a.b.c.d` lines.
    ///
    /// Some Windows builds append `(Preferred)` to the address. The last
    /// well-formed address wins.
    fn extract_address(&self, exec_output: &str) -> String {
        exec_output
            .lines()
            .filter(|line| line.contains("IPv4"))
            .filter_map(|line| line.split_once(':'))
            .map(|(_, value)| value.trim().trim_end_matches("(Preferred)"))
            .filter(|value| value.parse::<Ipv4Addr>().is_ok())
            .last()
            .map(str::to_string)
            .unwrap_or_default()
    }
}

impl Platform {
    /// The detector matching this image family
    pub fn detector(&self) -> Box<dyn ReadinessDetector> {
        match self {
            Platform::Linux => Box::new(LinuxReadiness),
            Platform::Windows => Box::new(WindowsReadiness),
        }
    }
}
