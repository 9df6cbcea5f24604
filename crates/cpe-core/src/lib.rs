//! cpe-core: Shared types and error taxonomy for the CPE inventory scanner.
//!
//! This crate provides the vocabulary every other component speaks:
//! - The read-only credential set used to log into devices
//! - Fact records extracted from one accepted device
//! - The terminal outcome of scanning one address
//! - Per-host and per-session error types

pub mod error;
pub mod types;

pub use error::{ScanError, SessionError};
pub use types::{Credentials, FactRecord, ScanOutcome, MODEL_NOT_FOUND};
