//! Append-only inventory report.
//!
//! One block per accepted device in the order devices completed, then a
//! single model summary once every subnet has been scanned.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use cpe_core::FactRecord;

use crate::error::{InventoryError, Result};
use crate::ledger::ModelCounts;

const SEPARATOR_WIDTH: usize = 50;

/// Report path for a run started at `run_time`.
pub fn report_path(output_dir: &Path, run_time: &DateTime<Local>) -> PathBuf {
    output_dir.join(format!(
        "router_inventory_{}.txt",
        run_time.format("%Y-%m-%d_%H-%M-%S")
    ))
}

/// Writes device blocks and the closing summary.
pub struct InventoryReport<W: Write> {
    out: W,
    label: String,
    run_time: DateTime<Local>,
    records_written: usize,
    finished: bool,
}

impl InventoryReport<BufWriter<File>> {
    /// Create the report file, and its directory if needed.
    pub fn create(path: &Path, label: &str, run_time: DateTime<Local>) -> Result<Self> {
        let create_err = |source: std::io::Error| InventoryError::ReportCreate {
            path: path.display().to_string(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(create_err)?;
        }
        let file = File::create(path).map_err(create_err)?;
        Ok(Self::from_writer(BufWriter::new(file), label, run_time))
    }
}

impl<W: Write> InventoryReport<W> {
    pub fn from_writer(out: W, label: &str, run_time: DateTime<Local>) -> Self {
        Self {
            out,
            label: label.to_string(),
            run_time,
            records_written: 0,
            finished: false,
        }
    }

    /// Append one device block and flush it.
    pub fn write_record(&mut self, record: &FactRecord) -> Result<()> {
        writeln!(self.out, "{}-{} Information", self.label, record.hostname)?;
        writeln!(self.out, "Management Address: {}", record.address)?;
        writeln!(self.out, "Date and Time: {}", self.timestamp())?;
        writeln!(self.out, "Model Number: {}", record.model_number)?;
        writeln!(self.out, "Serial Number: {}", record.serial_number)?;
        writeln!(self.out, "IP Addresses:\n{}", record.interface_summary)?;
        writeln!(self.out, "{}", "=".repeat(SEPARATOR_WIDTH))?;
        self.out.flush()?;

        self.records_written += 1;
        Ok(())
    }

    /// Append the model summary. Only the first call writes anything.
    pub fn write_summary(&mut self, models: &ModelCounts) -> Result<()> {
        if self.finished {
            tracing::warn!("Report summary already written, ignoring");
            return Ok(());
        }

        writeln!(self.out, "Script completed on: {}\n", self.timestamp())?;
        writeln!(self.out, "Router Model Summary:")?;
        for (model, count) in models.iter() {
            writeln!(self.out, "{model}: {count} routers")?;
        }
        self.out.flush()?;

        self.finished = true;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn timestamp(&self) -> String {
        self.run_time.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn run_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    fn record(hostname: &str, serial: &str, model: &str) -> FactRecord {
        FactRecord {
            hostname: hostname.to_string(),
            serial_number: serial.to_string(),
            model_number: model.to_string(),
            interface_summary: "Gi0/0/0  10.0.0.1  YES NVRAM  up  up".to_string(),
            address: "10.0.0.1".parse().unwrap(),
        }
    }

    #[test]
    fn test_report_path() {
        let path = report_path(Path::new("router_inventory"), &run_time());
        assert_eq!(
            path,
            PathBuf::from("router_inventory/router_inventory_2024-03-09_14-05-07.txt")
        );
    }

    #[test]
    fn test_record_block_layout() {
        let mut report = InventoryReport::from_writer(Vec::new(), "CISCO-ROUTER", run_time());
        report.write_record(&record("edge-1", "ABC123", "X1")).unwrap();
        assert_eq!(report.records_written(), 1);

        let text = String::from_utf8(report.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "CISCO-ROUTER-edge-1 Information");
        assert_eq!(lines[1], "Management Address: 10.0.0.1");
        assert_eq!(lines[2], "Date and Time: 2024-03-09 14:05:07");
        assert_eq!(lines[3], "Model Number: X1");
        assert_eq!(lines[4], "Serial Number: ABC123");
        assert_eq!(lines[5], "IP Addresses:");
        assert_eq!(lines[6], "Gi0/0/0  10.0.0.1  YES NVRAM  up  up");
        assert_eq!(lines[7], "=".repeat(50));
    }

    #[test]
    fn test_summary_written_once() {
        let mut report = InventoryReport::from_writer(Vec::new(), "CISCO-ROUTER", run_time());
        let mut models = ModelCounts::default();
        models.record("X1");
        models.record("X1");
        models.record("C1111-4P");

        report.write_summary(&models).unwrap();
        report.write_summary(&models).unwrap();

        let text = String::from_utf8(report.into_inner()).unwrap();
        assert_eq!(text.matches("Router Model Summary:").count(), 1);
        assert!(text.contains("Script completed on: 2024-03-09 14:05:07\n\n"));
        assert!(text.ends_with("X1: 2 routers\nC1111-4P: 1 routers\n"));
    }

    #[test]
    fn test_empty_summary() {
        let mut report = InventoryReport::from_writer(Vec::new(), "CISCO-ROUTER", run_time());
        report.write_summary(&ModelCounts::default()).unwrap();
        let text = String::from_utf8(report.into_inner()).unwrap();
        assert!(text.ends_with("Router Model Summary:\n"));
    }

    #[test]
    fn test_create_makes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = report_path(&dir.path().join("nested"), &run_time());
        let mut report = InventoryReport::create(&path, "CISCO-ROUTER", run_time()).unwrap();
        report.write_record(&record("edge-1", "ABC123", "X1")).unwrap();
        drop(report);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("CISCO-ROUTER-edge-1 Information\n"));
    }

    #[test]
    fn test_create_fails_on_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let path = report_path(&blocker, &run_time());
        let result = InventoryReport::create(&path, "CISCO-ROUTER", run_time());
        assert!(matches!(result, Err(InventoryError::ReportCreate { .. })));
    }
}
