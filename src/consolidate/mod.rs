//! Cross-workbook sheet consolidation.
//!
//! The engine re-opens every workbook of the batch, pulls the sheets matching
//! the selection, stacks them per key and writes the result as one xlsx buffer.
//! Workbooks or sheets that fail to read are recorded and skipped; only an
//! empty selection or a failing writer aborts the run.

pub mod concat;
pub mod naming;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ToolError};
use crate::io::excel_write;
use crate::io::{SheetSource, WorkbookHandle};
use crate::model::{ConsolidationMode, FileFailure, SelectionKey, SheetTable, Table, Workbook};
use crate::select::SelectionSet;

pub use concat::{ColumnAlignment, concat_tables};
pub use naming::{SheetNameRegistry, output_sheet_name};

/// Tunables for a consolidation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationOptions {
    pub columns: ColumnAlignment,
}

/// Outcome counters of a consolidation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationStats {
    /// Workbooks iterated, including the ones that failed to open.
    pub files_processed: usize,
    /// Keys that produced an output sheet.
    pub sheets_consolidated: usize,
    pub failures: Vec<FileFailure>,
}

/// The finished xlsx file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputWorkbook {
    pub bytes: Vec<u8>,
    /// Sheet names in the order they were written.
    pub sheet_names: Vec<String>,
}

/// Progress notification emitted after each workbook is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress<'a> {
    pub completed: usize,
    pub total: usize,
    pub file: &'a str,
}

/// Tables collected per selected key, before concatenation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatheredSheets {
    /// One entry per selected key, in selection order.
    pub groups: Vec<(SelectionKey, Vec<Table>)>,
    pub files_processed: usize,
    pub failures: Vec<FileFailure>,
}

impl GatheredSheets {
    /// Source tables collected for `key`.
    pub fn sources(&self, key: &SelectionKey) -> &[Table] {
        self.groups
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, tables)| tables.as_slice())
            .unwrap_or(&[])
    }
}

/// Consolidates the selected sheets of `workbooks` into a single workbook.
pub fn consolidate<S: SheetSource>(
    source: &S,
    workbooks: &[Workbook],
    mode: ConsolidationMode,
    selection: &SelectionSet,
    options: ConsolidationOptions,
) -> Result<(OutputWorkbook, ConsolidationStats)> {
    consolidate_with_progress(source, workbooks, mode, selection, options, |_| {})
}

/// Same as [`consolidate`], invoking `on_progress` after each workbook.
#[instrument(
    level = "info",
    skip_all,
    fields(workbooks = workbooks.len(), %mode, selected = selection.len())
)]
pub fn consolidate_with_progress<S, F>(
    source: &S,
    workbooks: &[Workbook],
    mode: ConsolidationMode,
    selection: &SelectionSet,
    options: ConsolidationOptions,
    on_progress: F,
) -> Result<(OutputWorkbook, ConsolidationStats)>
where
    S: SheetSource,
    F: FnMut(Progress<'_>),
{
    if selection.is_empty() {
        return Err(ToolError::EmptySelection);
    }

    let gathered = gather_sheets(source, workbooks, mode, selection, on_progress);
    let tables = merge_groups(gathered.groups, options.columns);
    if tables.is_empty() {
        return Err(ToolError::NothingToWrite);
    }

    let bytes = excel_write::write_workbook_to_buffer(&tables)?;
    let sheet_names: Vec<String> = tables.iter().map(|table| table.sheet_name.clone()).collect();

    let stats = ConsolidationStats {
        files_processed: gathered.files_processed,
        sheets_consolidated: tables.len(),
        failures: gathered.failures,
    };
    info!(
        files = stats.files_processed,
        sheets = stats.sheets_consolidated,
        failed = stats.failures.len(),
        "consolidation complete"
    );

    Ok((OutputWorkbook { bytes, sheet_names }, stats))
}

/// Re-opens each workbook in order and collects the sheets matching the
/// selection. Keys that do not belong to `mode` are ignored.
pub fn gather_sheets<S, F>(
    source: &S,
    workbooks: &[Workbook],
    mode: ConsolidationMode,
    selection: &SelectionSet,
    mut on_progress: F,
) -> GatheredSheets
where
    S: SheetSource,
    F: FnMut(Progress<'_>),
{
    let mut gathered = GatheredSheets {
        groups: selection
            .iter()
            .filter(|key| key.mode() == mode)
            .map(|key| (key.clone(), Vec::new()))
            .collect(),
        ..GatheredSheets::default()
    };

    for (idx, workbook) in workbooks.iter().enumerate() {
        gathered.files_processed += 1;
        match source.open(workbook) {
            Ok(mut handle) => {
                let sheet_names = handle.sheet_names();
                for (key, tables) in gathered.groups.iter_mut() {
                    let Some(sheet) = matching_sheet(key, &sheet_names) else {
                        continue;
                    };
                    match handle.read_sheet(&sheet) {
                        Ok(table) => {
                            debug!(
                                file = %workbook.name,
                                sheet = %sheet,
                                rows = table.row_count(),
                                "collected sheet"
                            );
                            tables.push(table);
                        }
                        Err(error) => {
                            warn!(file = %workbook.name, %error, "skipping sheet");
                            gathered
                                .failures
                                .push(FileFailure::from_error(&workbook.name, &error));
                        }
                    }
                }
            }
            Err(error) => {
                warn!(file = %workbook.name, %error, "skipping workbook");
                gathered
                    .failures
                    .push(FileFailure::from_error(&workbook.name, &error));
            }
        }

        on_progress(Progress {
            completed: idx + 1,
            total: workbooks.len(),
            file: &workbook.name,
        });
    }

    gathered
}

fn matching_sheet(key: &SelectionKey, sheet_names: &[String]) -> Option<String> {
    match key {
        SelectionKey::Position(position) => (*position as usize)
            .checked_sub(1)
            .and_then(|idx| sheet_names.get(idx))
            .cloned(),
        SelectionKey::Name(name) => sheet_names.iter().find(|sheet| *sheet == name).cloned(),
    }
}

/// Concatenates each non-empty group and names the resulting sheets. Empty
/// groups are dropped.
pub fn merge_groups(
    groups: Vec<(SelectionKey, Vec<Table>)>,
    columns: ColumnAlignment,
) -> Vec<SheetTable> {
    let mut registry = SheetNameRegistry::default();
    groups
        .into_iter()
        .filter(|(_, tables)| !tables.is_empty())
        .map(|(key, tables)| {
            let sheet_name = registry.assign(&output_sheet_name(&key));
            SheetTable {
                sheet_name,
                table: concat_tables(tables, columns),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::memory::{MemorySource, sample_table};
    use crate::select::{select, select_all};

    fn sales_source() -> MemorySource {
        MemorySource::new()
            .with_sheets("a.xlsx", &[("Vendas", 2), ("Estoque", 3)])
            .with_sheets("b.xlsx", &[("Vendas", 1)])
            .with_sheets("c.xlsx", &[("Vendas", 4), ("Estoque", 1), ("RH", 2)])
    }

    fn sales_batch() -> Vec<Workbook> {
        ["a.xlsx", "b.xlsx", "c.xlsx"]
            .into_iter()
            .map(Workbook::from_path)
            .collect()
    }

    fn positions(keys: &[u32]) -> SelectionSet {
        let keys: Vec<SelectionKey> = keys.iter().map(|p| SelectionKey::Position(*p)).collect();
        select_all(&keys)
    }

    #[test]
    fn gathers_by_position() {
        let gathered = gather_sheets(
            &sales_source(),
            &sales_batch(),
            ConsolidationMode::ByPosition,
            &positions(&[1, 3]),
            |_| {},
        );

        assert_eq!(gathered.sources(&SelectionKey::Position(1)).len(), 3);
        assert_eq!(gathered.sources(&SelectionKey::Position(3)).len(), 1);
        assert_eq!(gathered.files_processed, 3);
    }

    #[test]
    fn gathers_by_name() {
        let selection = select_all(&[SelectionKey::Name("Estoque".into())]);
        let gathered = gather_sheets(
            &sales_source(),
            &sales_batch(),
            ConsolidationMode::ByName,
            &selection,
            |_| {},
        );

        let sources = gathered.sources(&SelectionKey::Name("Estoque".into()));
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0], sample_table("Estoque", 3));
        assert_eq!(sources[1], sample_table("Estoque", 1));
    }

    #[test]
    fn empty_selection_is_rejected() {
        let result = consolidate(
            &sales_source(),
            &sales_batch(),
            ConsolidationMode::ByName,
            &SelectionSet::empty(),
            ConsolidationOptions::default(),
        );

        assert!(matches!(result, Err(ToolError::EmptySelection)));
    }

    #[test]
    fn consolidation_names_sheets_and_counts() {
        let (output, stats) = consolidate(
            &sales_source(),
            &sales_batch(),
            ConsolidationMode::ByPosition,
            &positions(&[1, 2, 3]),
            ConsolidationOptions::default(),
        )
        .expect("consolidated");

        assert_eq!(
            output.sheet_names,
            vec!["Aba1_Consolidada", "Aba2_Consolidada", "Aba3_Consolidada"]
        );
        assert!(!output.bytes.is_empty());
        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.sheets_consolidated, 3);
        assert!(stats.failures.is_empty());
    }

    #[test]
    fn merged_rows_sum_contributions() {
        let gathered = gather_sheets(
            &sales_source(),
            &sales_batch(),
            ConsolidationMode::ByName,
            &select_all(&[SelectionKey::Name("Vendas".into())]),
            |_| {},
        );
        let tables = merge_groups(gathered.groups, ColumnAlignment::FirstSheet);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].sheet_name, "Vendas_Consolidada");
        assert_eq!(tables[0].table.row_count(), 2 + 1 + 4);
        assert_eq!(tables[0].table.columns, vec!["id"]);
    }

    #[test]
    fn keys_without_sources_are_dropped() {
        let source = MemorySource::new().with_sheets("a.xlsx", &[("Vendas", 1)]);
        let workbooks = vec![Workbook::from_path("a.xlsx")];
        // Position 2 is valid for a wider batch but absent here.
        let (output, stats) = consolidate(
            &source,
            &workbooks,
            ConsolidationMode::ByPosition,
            &positions(&[1, 2]),
            ConsolidationOptions::default(),
        )
        .expect("consolidated");

        assert_eq!(output.sheet_names, vec!["Aba1_Consolidada"]);
        assert_eq!(stats.sheets_consolidated, 1);
    }

    #[test]
    fn no_surviving_sheets_is_an_error() {
        let source = MemorySource::new().with_sheets("a.xlsx", &[("Vendas", 1)]);
        let result = consolidate(
            &source,
            &[Workbook::from_path("a.xlsx")],
            ConsolidationMode::ByName,
            &select_all(&[SelectionKey::Name("RH".into())]),
            ConsolidationOptions::default(),
        );

        assert!(matches!(result, Err(ToolError::NothingToWrite)));
    }

    #[test]
    fn failing_workbook_is_skipped_but_counted() {
        let source = sales_source().with_corrupt("broken.xlsx");
        let mut workbooks = sales_batch();
        workbooks.insert(1, Workbook::from_path("broken.xlsx"));

        let (_, stats) = consolidate(
            &source,
            &workbooks,
            ConsolidationMode::ByPosition,
            &positions(&[1]),
            ConsolidationOptions::default(),
        )
        .expect("consolidated");

        assert_eq!(stats.files_processed, 4);
        assert_eq!(stats.sheets_consolidated, 1);
        assert_eq!(stats.failures.len(), 1);
        assert_eq!(stats.failures[0].file, "broken.xlsx");
    }

    #[test]
    fn failing_sheet_keeps_other_sheets() {
        let source = sales_source().with_unreadable_sheet("c.xlsx", "Estoque");
        let gathered = gather_sheets(
            &source,
            &sales_batch(),
            ConsolidationMode::ByPosition,
            &positions(&[1, 2]),
            |_| {},
        );

        assert_eq!(gathered.sources(&SelectionKey::Position(1)).len(), 3);
        assert_eq!(gathered.sources(&SelectionKey::Position(2)).len(), 1);
        assert_eq!(gathered.failures.len(), 1);
        assert_eq!(gathered.failures[0].sheet.as_deref(), Some("Estoque"));
    }

    #[test]
    fn progress_is_reported_per_workbook() {
        let mut seen = Vec::new();
        gather_sheets(
            &sales_source(),
            &sales_batch(),
            ConsolidationMode::ByPosition,
            &positions(&[1]),
            |progress| seen.push((progress.completed, progress.total, progress.file.to_string())),
        );

        assert_eq!(
            seen,
            vec![
                (1, 3, "a.xlsx".to_string()),
                (2, 3, "b.xlsx".to_string()),
                (3, 3, "c.xlsx".to_string()),
            ]
        );
    }

    #[test]
    fn truncated_names_do_not_collide() {
        let prefix = "Indicadores Trimestrais Regiao";
        let first = format!("{prefix} Norte");
        let second = format!("{prefix} Sul");
        let source = MemorySource::new()
            .with_table("a.xlsx", &first, sample_table("n", 1))
            .with_table("a.xlsx", &second, sample_table("s", 1));
        let keys = vec![SelectionKey::Name(first), SelectionKey::Name(second)];

        let (output, _) = consolidate(
            &source,
            &[Workbook::from_path("a.xlsx")],
            ConsolidationMode::ByName,
            &select(&keys, &keys),
            ConsolidationOptions::default(),
        )
        .expect("consolidated");

        assert_eq!(output.sheet_names.len(), 2);
        assert_eq!(output.sheet_names[0], "Indicadores Trimestrais Regiao ");
        assert_eq!(output.sheet_names[1], "Indicadores Trimestrais Regia_1");
    }
}
