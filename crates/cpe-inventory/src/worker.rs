//! Per-host scan protocol.
//!
//! connect → privileged mode (primary, then fallback on a fresh session) →
//! collect facts → claim serial → close. Every failure ends as a
//! [`ScanOutcome::Failed`] for this host only.

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpe_core::{Credentials, FactRecord, ScanError, ScanOutcome, SessionError};

use crate::ledger::{Claim, DedupTable};
use crate::parse;
use crate::session::{Connector, Session, SessionParams};

pub const SHOW_HOSTNAME: &str = "show running-config | include hostname";
pub const SHOW_SERIAL: &str = "show inventory | include SN:";
pub const SHOW_INVENTORY: &str = "show inventory";
pub const SHOW_INTERFACES: &str = "show ip interface brief | exclude unassigned";

/// Which enable secret the current session is established with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStep {
    Primary,
    Fallback,
}

impl AuthStep {
    fn secret(self, credentials: &Credentials) -> &str {
        match self {
            Self::Primary => &credentials.enable_secret,
            Self::Fallback => &credentials.alternate_enable_secret,
        }
    }
}

/// Drives one address from connect to a terminal [`ScanOutcome`].
pub struct HostWorker<C: Connector> {
    connector: Arc<C>,
    credentials: Arc<Credentials>,
    dedup: Arc<DedupTable>,
    port: u16,
    timeout: Duration,
}

impl<C: Connector> HostWorker<C> {
    pub fn new(
        connector: Arc<C>,
        credentials: Arc<Credentials>,
        dedup: Arc<DedupTable>,
        port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            connector,
            credentials,
            dedup,
            port,
            timeout,
        }
    }

    /// Scan one address. Never fails; errors become `Failed` outcomes.
    pub async fn scan(&self, address: IpAddr) -> ScanOutcome {
        let start = Instant::now();

        let mut session = match self.authenticate(address).await {
            Ok(session) => session,
            Err(error) => return ScanOutcome::failed(address, error),
        };

        let outcome = match self.collect(&mut session, address).await {
            Ok(record) => match self.dedup.claim(&record.serial_number, &record.hostname) {
                Claim::Accepted => ScanOutcome::Accepted(record),
                Claim::Duplicate { first_hostname } => ScanOutcome::Duplicate {
                    address,
                    serial_number: record.serial_number,
                    first_hostname,
                },
            },
            Err(error) => ScanOutcome::failed(address, error),
        };

        self.close(&mut session).await;

        tracing::debug!(
            address = %outcome.address(),
            accepted = outcome.is_accepted(),
            duration_ms = start.elapsed().as_millis(),
            "Host worker finished"
        );
        outcome
    }

    /// Open a session and reach privileged mode, falling back once to the
    /// alternate secret on a fresh session.
    async fn authenticate(&self, address: IpAddr) -> Result<C::Session, ScanError> {
        let mut step = AuthStep::Primary;
        loop {
            let secret = step.secret(&self.credentials);
            let mut session = self.open(address, secret).await?;

            let entered = self.bounded(session.enter_privileged(secret)).await;
            let reason = match entered {
                Ok(()) => return Ok(session),
                Err(reason) => reason,
            };
            self.close(&mut session).await;

            match step {
                AuthStep::Primary => {
                    tracing::warn!(
                        address = %address,
                        error = %reason,
                        "Primary enable secret failed, retrying with alternate secret"
                    );
                    step = AuthStep::Fallback;
                }
                AuthStep::Fallback => {
                    return Err(ScanError::Auth(format!(
                        "primary and alternate enable secrets rejected: {reason}"
                    )));
                }
            }
        }
    }

    async fn open(&self, address: IpAddr, secret: &str) -> Result<C::Session, ScanError> {
        let params = SessionParams {
            address,
            port: self.port,
            username: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
            privileged_secret: secret.to_string(),
            timeout: self.timeout,
        };
        self.bounded(self.connector.open(&params))
            .await
            .map_err(ScanError::Connection)
    }

    async fn collect(
        &self,
        session: &mut C::Session,
        address: IpAddr,
    ) -> Result<FactRecord, ScanError> {
        let output = self.command(session, SHOW_HOSTNAME).await?;
        let hostname = parse::hostname(&output)
            .ok_or_else(|| missing_field(SHOW_HOSTNAME, "no hostname in output"))?;

        let output = self.command(session, SHOW_SERIAL).await?;
        let serial_number = parse::serial_number(&output)
            .ok_or_else(|| missing_field(SHOW_SERIAL, "no serial number in output"))?;

        let output = self.command(session, SHOW_INVENTORY).await?;
        let model_number = parse::model_number(&output);

        let output = self.command(session, SHOW_INTERFACES).await?;
        let interface_summary = parse::interface_summary(&output);

        Ok(FactRecord {
            hostname,
            serial_number,
            model_number,
            interface_summary,
            address,
        })
    }

    async fn command(&self, session: &mut C::Session, command: &str) -> Result<String, ScanError> {
        self.bounded(session.run(command))
            .await
            .map_err(|reason| ScanError::Command {
                command: command.to_string(),
                reason,
            })
    }

    async fn close(&self, session: &mut C::Session) {
        let _ = tokio::time::timeout(self.timeout, session.close()).await;
    }

    /// Apply the per-operation timeout, flattening both failure kinds to text.
    async fn bounded<T, F>(&self, op: F) -> Result<T, String>
    where
        F: Future<Output = Result<T, SessionError>>,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {}s", self.timeout.as_secs_f64())),
        }
    }
}

fn missing_field(command: &str, reason: &str) -> ScanError {
    ScanError::Command {
        command: command.to_string(),
        reason: reason.to_string(),
    }
}
