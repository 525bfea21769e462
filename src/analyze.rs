//! Structural analysis of a workbook batch.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::io::{SheetSource, WorkbookHandle};
use crate::model::{FileFailure, Workbook};

/// Sheet layout of one successfully opened workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkbookRecord {
    /// Position of the workbook in the analysed batch.
    pub batch_index: usize,
    pub file_name: String,
    pub sheet_count: usize,
    pub sheet_names: Vec<String>,
}

/// Aggregate sheet structure of a batch.
///
/// `records` keeps the batch order and excludes workbooks that failed to open;
/// those are listed in `failures` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuralReport {
    pub records: Vec<WorkbookRecord>,
    /// Every sheet name, in workbook-then-sheet order.
    pub all_sheet_names: Vec<String>,
    pub frequencies: BTreeMap<String, usize>,
    pub failures: Vec<FileFailure>,
}

impl StructuralReport {
    /// Number of workbooks that were analysed successfully.
    pub fn total_workbooks(&self) -> usize {
        self.records.len()
    }

    pub fn total_sheets(&self) -> usize {
        self.all_sheet_names.len()
    }

    pub fn max_sheet_count(&self) -> usize {
        self.records
            .iter()
            .map(|record| record.sheet_count)
            .max()
            .unwrap_or(0)
    }

    pub fn average_sheets_per_workbook(&self) -> f64 {
        if self.records.is_empty() {
            0.0
        } else {
            self.total_sheets() as f64 / self.records.len() as f64
        }
    }

    pub fn frequency(&self, name: &str) -> usize {
        self.frequencies.get(name).copied().unwrap_or(0)
    }
}

/// Lists the sheets of every workbook in `workbooks`.
///
/// A workbook that cannot be opened is recorded as a failure and skipped; the
/// rest of the batch is still analysed.
#[instrument(level = "info", skip_all, fields(workbooks = workbooks.len()))]
pub fn analyze<S: SheetSource>(source: &S, workbooks: &[Workbook]) -> StructuralReport {
    let mut report = StructuralReport::default();

    for (batch_index, workbook) in workbooks.iter().enumerate() {
        let sheet_names = match source.open(workbook) {
            Ok(handle) => handle.sheet_names(),
            Err(error) => {
                warn!(file = %workbook.name, %error, "skipping workbook");
                report
                    .failures
                    .push(FileFailure::from_error(&workbook.name, &error));
                continue;
            }
        };

        for name in &sheet_names {
            *report.frequencies.entry(name.clone()).or_insert(0) += 1;
        }
        report.all_sheet_names.extend(sheet_names.iter().cloned());
        report.records.push(WorkbookRecord {
            batch_index,
            file_name: workbook.name.clone(),
            sheet_count: sheet_names.len(),
            sheet_names,
        });
    }

    info!(
        analysed = report.total_workbooks(),
        failed = report.failures.len(),
        sheets = report.total_sheets(),
        "analysis complete"
    );
    report
}
