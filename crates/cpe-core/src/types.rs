//! Core domain types for the CPE inventory scanner.
//!
//! These types describe what is known about a device after one scan and
//! how the scan of a single address ended.

use std::fmt;
use std::net::IpAddr;

use crate::error::ScanError;

/// Model number recorded when `show inventory` carries no `PID:` line.
pub const MODEL_NOT_FOUND: &str = "Model not found";

// ── Credentials ───────────────────────────────────────────────────

/// Login and privileged-mode secrets shared by every worker in a run.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Secret tried first when entering privileged mode.
    pub enable_secret: String,
    /// Secret tried on a fresh session after the primary is rejected.
    pub alternate_enable_secret: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        enable_secret: impl Into<String>,
        alternate_enable_secret: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            enable_secret: enable_secret.into(),
            alternate_enable_secret: alternate_enable_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("enable_secret", &"<redacted>")
            .field("alternate_enable_secret", &"<redacted>")
            .finish()
    }
}

// ── Fact Record ───────────────────────────────────────────────────

/// Identity and configuration facts of one accepted device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRecord {
    pub hostname: String,
    pub serial_number: String,
    pub model_number: String,
    /// Interface lines with an assigned address, as printed by the device.
    pub interface_summary: String,
    /// Management address the device answered on.
    pub address: IpAddr,
}

// ── Scan Outcome ──────────────────────────────────────────────────

/// Terminal result of scanning one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The device was inventoried and its serial claimed by this address.
    Accepted(FactRecord),
    /// Another address already reported this serial number.
    Duplicate {
        address: IpAddr,
        serial_number: String,
        first_hostname: String,
    },
    Failed { address: IpAddr, error: ScanError },
}

impl ScanOutcome {
    pub fn failed(address: IpAddr, error: ScanError) -> Self {
        Self::Failed { address, error }
    }

    /// The address this outcome was produced for.
    pub fn address(&self) -> IpAddr {
        match self {
            Self::Accepted(record) => record.address,
            Self::Duplicate { address, .. } | Self::Failed { address, .. } => *address,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}
