//! Dataset (JSONL) and audit log (CSV) output.
//!
//! Both files are truncated when the writer is created and only appended to
//! afterwards. Dropping the writer flushes buffered rows, so an aborted run
//! still leaves every completed row on disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use pubcurate_common::Result;

use crate::models::{AuditRow, TaskRecord};
use crate::pyjson;

pub const AUDIT_HEADER: [&str; 4] = ["PMID", "PMCID", "TokenCount", "Included"];

pub struct DatasetWriter {
    dataset: BufWriter<File>,
    log: csv::Writer<File>,
    records: usize,
    audits: usize,
}

fn create_truncated(path: &Path) -> std::io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    File::create(path)
}

impl DatasetWriter {
    pub fn create(dataset_path: &Path, log_path: &Path) -> Result<Self> {
        let dataset = BufWriter::new(create_truncated(dataset_path)?);
        let mut log = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(create_truncated(log_path)?);
        log.write_record(AUDIT_HEADER)?;

        Ok(Self { dataset, log, records: 0, audits: 0 })
    }

    pub fn write_record(&mut self, record: &TaskRecord) -> Result<()> {
        pyjson::to_writer(&mut self.dataset, record)?;
        self.dataset.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    pub fn write_audit(&mut self, row: &AuditRow) -> Result<()> {
        self.log.serialize(row)?;
        self.audits += 1;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records
    }

    pub fn audits_written(&self) -> usize {
        self.audits
    }

    /// Flush both files, surfacing any I/O error.
    pub fn finish(mut self) -> Result<()> {
        self.dataset.flush()?;
        self.log.flush()?;
        Ok(())
    }
}
