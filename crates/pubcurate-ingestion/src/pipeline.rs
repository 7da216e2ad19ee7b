//! Per-row dataset pipeline.
//!
//! For each Open Access manifest row, strictly in order:
//!   1. Resolve PMID → PMCID
//!   2. Fetch the BioC document (raw payload saved by the fetcher)
//!   3. Count tokens and apply the size gate
//!   4. Append the task record (if accepted) and one audit row
//!
//! A failing row is recorded in the audit log and never stops the run. Only
//! output write errors are fatal.

use std::time::{Duration, Instant};

use pubcurate_common::Result;
use serde::Serialize;
use tracing::{info, instrument};

use crate::models::{AuditRow, InclusionStatus, MetadataRow, TaskRecord};
use crate::record::{Gate, RecordBuilder};
use crate::sources::{DocumentFetcher, IdResolver};
use crate::tokens::TokenCounter;
use crate::writer::DatasetWriter;

/// Pause between rows to go easy on the NCBI services.
pub const INTER_ROW_DELAY: Duration = Duration::from_secs(1);

/// What one row produced.
#[derive(Debug, Clone)]
pub struct RowOutcome {
    pub audit: AuditRow,
    pub record: Option<TaskRecord>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub rows: usize,
    pub included: usize,
    pub excluded: usize,
    pub no_pmcid: usize,
    pub no_text: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    fn tally(&mut self, status: InclusionStatus) {
        self.rows += 1;
        match status {
            InclusionStatus::Yes     => self.included += 1,
            InclusionStatus::No      => self.excluded += 1,
            InclusionStatus::NoPmcid => self.no_pmcid += 1,
            InclusionStatus::NoText  => self.no_text += 1,
        }
    }
}

pub struct Pipeline {
    resolver: Box<dyn IdResolver>,
    fetcher: Box<dyn DocumentFetcher>,
    counter: Box<dyn TokenCounter>,
    builder: RecordBuilder,
    delay: Duration,
}

impl Pipeline {
    pub fn new(
        resolver: Box<dyn IdResolver>,
        fetcher: Box<dyn DocumentFetcher>,
        counter: Box<dyn TokenCounter>,
        builder: RecordBuilder,
    ) -> Self {
        Self { resolver, fetcher, counter, builder, delay: INTER_ROW_DELAY }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run stages 1–3 for one row. Never fails; every outcome is an audit row.
    #[instrument(skip_all, fields(pmid = %row.pmid))]
    pub async fn process_row(&self, row: &MetadataRow) -> RowOutcome {
        let pmid = row.pmid.as_str();
        info!("Processing PMID: {pmid}");

        let Some(pmcid) = self.resolver.resolve(pmid).await else {
            info!("No PMCID found for PMID {pmid}");
            return RowOutcome { audit: AuditRow::no_pmcid(pmid), record: None };
        };
        info!("Found PMCID: {pmcid}");

        let Some(doc) = self.fetcher.fetch(&pmcid).await else {
            info!("Failed to fetch article text for PMCID {pmcid}");
            return RowOutcome { audit: AuditRow::no_text(pmid, &pmcid), record: None };
        };

        let token_count = self.counter.count(&doc.text);
        info!(token_count, payload_bytes = doc.raw.len(), "Token count");

        match self.builder.decide(token_count) {
            Gate::Included => {
                let record = self.builder.build(row, &pmcid, &doc.text);
                info!("Added PMID {pmid} to dataset");
                RowOutcome {
                    audit: AuditRow::counted(pmid, &pmcid, token_count, true),
                    record: Some(record),
                }
            }
            Gate::Excluded => {
                info!("Skipping PMID {pmid}: Too many tokens ({token_count})");
                RowOutcome {
                    audit: AuditRow::counted(pmid, &pmcid, token_count, false),
                    record: None,
                }
            }
        }
    }

    /// Process `rows` in order, writing through `writer`.
    pub async fn run(&self, rows: &[MetadataRow], writer: &mut DatasetWriter) -> Result<RunSummary> {
        let t0 = Instant::now();
        let mut summary = RunSummary::default();

        for row in rows {
            let outcome = self.process_row(row).await;
            if let Some(ref record) = outcome.record {
                writer.write_record(record)?;
            }
            writer.write_audit(&outcome.audit)?;
            summary.tally(outcome.audit.status);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        summary.duration_ms = t0.elapsed().as_millis() as u64;
        info!(
            rows     = summary.rows,
            included = summary.included,
            excluded = summary.excluded,
            no_pmcid = summary.no_pmcid,
            no_text  = summary.no_text,
            duration_ms = summary.duration_ms,
            "Dataset pipeline complete"
        );
        Ok(summary)
    }
}
