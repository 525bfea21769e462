//! Explicit state threaded between the analysis, selection and consolidation
//! stages.

use tracing::debug;

use crate::analyze::{StructuralReport, analyze};
use crate::consolidate::{
    ConsolidationOptions, ConsolidationStats, OutputWorkbook, Progress, consolidate_with_progress,
};
use crate::error::{Result, ToolError};
use crate::io::SheetSource;
use crate::model::{ConsolidationMode, SelectionKey, Workbook};
use crate::select::{SelectionSet, Target, enumerate_targets, select, select_all, valid_keys};

/// State of one consolidation session: the batch, its report, the chosen mode
/// and the current selection.
///
/// The selection is always valid for the active mode: choosing a mode or
/// re-analysing the batch clears it. Consolidation only revisits workbooks that
/// opened during the last analysis.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    workbooks: Vec<Workbook>,
    analysed: Vec<Workbook>,
    report: Option<StructuralReport>,
    mode: Option<ConsolidationMode>,
    selection: SelectionSet,
}

impl SessionContext {
    pub fn new(workbooks: Vec<Workbook>) -> Self {
        Self {
            workbooks,
            ..Self::default()
        }
    }

    pub fn workbooks(&self) -> &[Workbook] {
        &self.workbooks
    }

    /// Workbooks that opened during the last analysis, in batch order.
    pub fn analysed(&self) -> &[Workbook] {
        &self.analysed
    }

    pub fn report(&self) -> Option<&StructuralReport> {
        self.report.as_ref()
    }

    pub fn mode(&self) -> Option<ConsolidationMode> {
        self.mode
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Analyses the batch, replacing any earlier report, mode and selection.
    pub fn analyze<S: SheetSource>(&mut self, source: &S) -> &StructuralReport {
        self.mode = None;
        self.selection = SelectionSet::empty();
        let report = analyze(source, &self.workbooks);
        self.analysed = report
            .records
            .iter()
            .filter_map(|record| self.workbooks.get(record.batch_index).cloned())
            .collect();
        self.report.insert(report)
    }

    /// Chooses the consolidation mode and clears the selection.
    pub fn set_mode(&mut self, mode: ConsolidationMode) {
        debug!(%mode, "consolidation mode chosen");
        self.mode = Some(mode);
        self.selection = SelectionSet::empty();
    }

    /// Targets available for the active mode; empty before analysis or before
    /// a mode is chosen.
    pub fn targets(&self) -> Vec<Target> {
        match (&self.report, self.mode) {
            (Some(report), Some(mode)) => enumerate_targets(report, mode),
            _ => Vec::new(),
        }
    }

    /// Replaces the selection with the valid subset of `candidates`.
    pub fn select<'a, I>(&mut self, candidates: I) -> &SelectionSet
    where
        I: IntoIterator<Item = &'a SelectionKey>,
    {
        let valid = valid_keys(&self.targets());
        self.selection = select(candidates, &valid);
        &self.selection
    }

    /// Selects every target of the active mode.
    pub fn select_all(&mut self) -> &SelectionSet {
        let valid = valid_keys(&self.targets());
        self.selection = select_all(&valid);
        &self.selection
    }

    /// Consolidates the current selection over the analysed workbooks. Fails
    /// with [`ToolError::EmptySelection`] when no mode is chosen or nothing is
    /// selected.
    pub fn consolidate<S, F>(
        &self,
        source: &S,
        options: ConsolidationOptions,
        on_progress: F,
    ) -> Result<(OutputWorkbook, ConsolidationStats)>
    where
        S: SheetSource,
        F: FnMut(Progress<'_>),
    {
        let Some(mode) = self.mode else {
            return Err(ToolError::EmptySelection);
        };
        consolidate_with_progress(
            source,
            &self.analysed,
            mode,
            &self.selection,
            options,
            on_progress,
        )
    }

    /// Forgets the report, mode and selection. The batch itself is kept.
    pub fn reset(&mut self) {
        self.analysed.clear();
        self.report = None;
        self.mode = None;
        self.selection = SelectionSet::empty();
    }
}
