//! cpe-inventory: Concurrent inventory scanner for telnet-managed routers.
//!
//! Logs into every usable address of the configured subnets, reaches
//! privileged mode with a primary or fallback secret, collects hostname,
//! serial, model and interface addresses, drops devices whose serial was
//! already seen, and writes one report with a per-model summary.

pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod parse;
pub mod report;
pub mod session;
pub mod subnet;
pub mod telnet;
pub mod worker;
