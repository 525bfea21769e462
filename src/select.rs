//! Target enumeration and selection validation.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::analyze::StructuralReport;
use crate::model::{ConsolidationMode, SelectionKey};

/// Number of distinct sheet names shown in a position label.
const LABEL_PREVIEW: usize = 3;

/// A selectable consolidation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub key: SelectionKey,
    pub label: String,
    /// Number of workbooks contributing a sheet to this target.
    pub count: usize,
    /// Distinct sheet names observed for this target, in first-seen order.
    pub sheet_names: Vec<String>,
}

/// The keys chosen for consolidation. Keys are unique and kept in target order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSet {
    keys: Vec<SelectionKey>,
}

impl SelectionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &[SelectionKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectionKey> {
        self.keys.iter()
    }
}

impl<'a> IntoIterator for &'a SelectionSet {
    type Item = &'a SelectionKey;
    type IntoIter = std::slice::Iter<'a, SelectionKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

/// Lists the targets available in `report` for `mode`.
///
/// Positions run from 1 to the largest sheet count; names are the distinct
/// sheet names in ascending order.
pub fn enumerate_targets(report: &StructuralReport, mode: ConsolidationMode) -> Vec<Target> {
    match mode {
        ConsolidationMode::ByPosition => position_targets(report),
        ConsolidationMode::ByName => name_targets(report),
    }
}

fn position_targets(report: &StructuralReport) -> Vec<Target> {
    (1..=report.max_sheet_count())
        .map(|position| {
            let observed: Vec<&String> = report
                .records
                .iter()
                .filter_map(|record| record.sheet_names.get(position - 1))
                .collect();

            let mut distinct: Vec<String> = Vec::new();
            for name in &observed {
                if !distinct.iter().any(|seen| seen == *name) {
                    distinct.push((*name).clone());
                }
            }

            Target {
                key: SelectionKey::Position(position as u32),
                label: position_label(position, &distinct),
                count: observed.len(),
                sheet_names: distinct,
            }
        })
        .collect()
}

fn position_label(position: usize, names: &[String]) -> String {
    let preview = names
        .iter()
        .take(LABEL_PREVIEW)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let ellipsis = if names.len() > LABEL_PREVIEW { "..." } else { "" };
    format!("Position {position} ({preview}{ellipsis})")
}

fn name_targets(report: &StructuralReport) -> Vec<Target> {
    report
        .frequencies
        .iter()
        .map(|(name, count)| Target {
            key: SelectionKey::Name(name.clone()),
            label: format!("{name} ({count}x)"),
            count: *count,
            sheet_names: vec![name.clone()],
        })
        .collect()
}

/// Keys of the given targets, in target order.
pub fn valid_keys(targets: &[Target]) -> Vec<SelectionKey> {
    targets.iter().map(|target| target.key.clone()).collect()
}

/// Keeps the candidates that appear in `valid`. Unknown keys are dropped.
pub fn select<'a, I>(candidates: I, valid: &[SelectionKey]) -> SelectionSet
where
    I: IntoIterator<Item = &'a SelectionKey>,
{
    let wanted: HashSet<&SelectionKey> = candidates.into_iter().collect();
    for key in &wanted {
        if !valid.contains(*key) {
            debug!(key = %key, "dropping unknown selection key");
        }
    }

    SelectionSet {
        keys: valid
            .iter()
            .filter(|key| wanted.contains(key))
            .cloned()
            .collect(),
    }
}

/// Selects every valid key.
pub fn select_all(valid: &[SelectionKey]) -> SelectionSet {
    let mut keys: Vec<SelectionKey> = Vec::with_capacity(valid.len());
    for key in valid {
        if !keys.contains(key) {
            keys.push(key.clone());
        }
    }
    SelectionSet { keys }
}
