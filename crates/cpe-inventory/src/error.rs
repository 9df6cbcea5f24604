//! Error types for the cpe-inventory crate.

use thiserror::Error;

/// Run-level failures. Per-host failures never surface here; they become
/// [`cpe_core::ScanOutcome::Failed`] instead.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Invalid subnet {cidr}: {reason}")]
    InvalidSubnet { cidr: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to create report at {path}: {source}")]
    ReportCreate {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for InventoryError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;
