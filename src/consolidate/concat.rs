use std::collections::HashMap;

use serde::Serialize;

use crate::model::{CellValue, Table};

/// How the columns of later tables are reconciled with the first one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnAlignment {
    /// Keep exactly the columns of the first table. Later tables are matched by
    /// header; their unknown columns are dropped and missing ones left empty.
    #[default]
    FirstSheet,
    /// Start from the first table's columns and append unseen headers in the
    /// order they are first met.
    Union,
}

/// A column identity: header text plus how many earlier columns of the same
/// table share that header. Lets duplicated headers line up one-to-one.
type ColumnId = (String, usize);

fn column_ids(columns: &[String]) -> Vec<ColumnId> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    columns
        .iter()
        .map(|column| {
            let occurrence = seen.entry(column.as_str()).or_insert(0);
            let id = (column.clone(), *occurrence);
            *occurrence += 1;
            id
        })
        .collect()
}

/// Stacks the rows of `tables` in order under a single header row.
///
/// The result always has as many rows as the inputs combined. Returns an empty
/// table when `tables` is empty.
pub fn concat_tables(tables: Vec<Table>, alignment: ColumnAlignment) -> Table {
    let mut tables = tables.into_iter();
    let Some(first) = tables.next() else {
        return Table::default();
    };
    let rest: Vec<Table> = tables.collect();

    let mut output_ids = column_ids(&first.columns);
    if alignment == ColumnAlignment::Union {
        for table in &rest {
            for id in column_ids(&table.columns) {
                if !output_ids.contains(&id) {
                    output_ids.push(id);
                }
            }
        }
    }

    let mut rows: Vec<Vec<CellValue>> =
        Vec::with_capacity(first.row_count() + rest.iter().map(Table::row_count).sum::<usize>());

    let first_ids = column_ids(&first.columns);
    let first_mapping = column_mapping(&output_ids, &first_ids);
    rows.extend(first.rows.iter().map(|row| project_row(row, &first_mapping)));

    for table in &rest {
        let mapping = column_mapping(&output_ids, &column_ids(&table.columns));
        rows.extend(table.rows.iter().map(|row| project_row(row, &mapping)));
    }

    let columns = output_ids.into_iter().map(|(name, _)| name).collect();
    Table::new(columns, rows)
}

/// For each output column, the index of the matching source column.
fn column_mapping(output: &[ColumnId], source: &[ColumnId]) -> Vec<Option<usize>> {
    let positions: HashMap<&ColumnId, usize> =
        source.iter().enumerate().map(|(idx, id)| (id, idx)).collect();
    output.iter().map(|id| positions.get(id).copied()).collect()
}

fn project_row(row: &[CellValue], mapping: &[Option<usize>]) -> Vec<CellValue> {
    mapping
        .iter()
        .map(|source| {
            source
                .and_then(|idx| row.get(idx))
                .cloned()
                .unwrap_or(CellValue::Empty)
        })
        .collect()
}
