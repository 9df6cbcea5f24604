//! Scan orchestration across the configured subnet list.
//!
//! Subnets are scanned one after another; hosts inside a subnet run
//! concurrently. The orchestrator owns the dedup table and the model counts
//! for the whole run and is the only writer of the report.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ipnet::IpNet;
use uuid::Uuid;

use cpe_core::{Credentials, ScanOutcome};

use crate::error::Result;
use crate::ledger::{DedupTable, ModelCounts};
use crate::report::InventoryReport;
use crate::session::Connector;
use crate::subnet::SubnetScanner;
use crate::worker::HostWorker;

/// Session settings applied to every host in a run.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub port: u16,
    /// Per-operation timeout for connect, enable and each command.
    pub timeout: Duration,
    pub max_concurrency: usize,
}

/// Totals for one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub addresses: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub models: ModelCounts,
}

pub struct ScanOrchestrator<C: Connector> {
    connector: Arc<C>,
    credentials: Arc<Credentials>,
    settings: ScanSettings,
}

impl<C: Connector> ScanOrchestrator<C> {
    pub fn new(connector: C, credentials: Credentials, settings: ScanSettings) -> Self {
        Self {
            connector: Arc::new(connector),
            credentials: Arc::new(credentials),
            settings,
        }
    }

    /// Scan every subnet in order, writing accepted devices to `report` as
    /// they complete and the model summary once at the end.
    pub async fn run<W: Write>(
        &self,
        subnets: &[IpNet],
        report: &mut InventoryReport<W>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary {
            run_id: Uuid::new_v4(),
            ..Default::default()
        };
        let start = Instant::now();

        tracing::info!(
            run_id = %summary.run_id,
            subnets = subnets.len(),
            max_concurrency = self.settings.max_concurrency,
            "Inventory run started"
        );

        let dedup = Arc::new(DedupTable::new());
        let worker = Arc::new(HostWorker::new(
            self.connector.clone(),
            self.credentials.clone(),
            dedup.clone(),
            self.settings.port,
            self.settings.timeout,
        ));
        let scanner = SubnetScanner::new(worker, self.settings.max_concurrency);

        for subnet in subnets {
            let mut scan = scanner.scan(*subnet);
            summary.addresses += scan.total();

            while let Some(outcome) = scan.next().await {
                self.consume(outcome, report, &mut summary)?;
            }

            tracing::info!(subnet = %subnet, "Subnet scan complete");
        }

        report.write_summary(&summary.models)?;

        tracing::info!(
            run_id = %summary.run_id,
            addresses = summary.addresses,
            accepted = summary.accepted,
            duplicates = summary.duplicates,
            failed = summary.failed,
            unique_serials = dedup.claimed(),
            duration_ms = start.elapsed().as_millis(),
            "Inventory run complete"
        );

        Ok(summary)
    }

    fn consume<W: Write>(
        &self,
        outcome: ScanOutcome,
        report: &mut InventoryReport<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        match outcome {
            ScanOutcome::Accepted(record) => {
                report.write_record(&record)?;
                summary.models.record(&record.model_number);
                summary.accepted += 1;
                tracing::info!(
                    address = %record.address,
                    hostname = %record.hostname,
                    serial = %record.serial_number,
                    model = %record.model_number,
                    "Host inventoried"
                );
            }
            ScanOutcome::Duplicate {
                address,
                serial_number,
                first_hostname,
            } => {
                summary.duplicates += 1;
                tracing::warn!(
                    address = %address,
                    serial = %serial_number,
                    first_hostname = %first_hostname,
                    "Duplicate serial number, skipping"
                );
            }
            ScanOutcome::Failed { address, error } => {
                summary.failed += 1;
                tracing::warn!(
                    address = %address,
                    kind = error.kind(),
                    error = %error,
                    "Host scan failed"
                );
            }
        }
        Ok(())
    }
}
