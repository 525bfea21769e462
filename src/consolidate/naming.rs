use std::collections::HashSet;

use tracing::warn;

use crate::model::SelectionKey;

/// Longest sheet name accepted by the xlsx format, in characters.
pub const MAX_SHEET_NAME_LEN: usize = 31;
/// Suffix appended to every consolidated sheet name.
pub const CONSOLIDATED_SUFFIX: &str = "_Consolidada";
/// Used when nothing of the requested name survives sanitising.
const FALLBACK_SHEET_NAME: &str = "Sheet";

/// Output sheet name for a key, before collision handling: `Aba<p>_Consolidada`
/// for positions and `<name>_Consolidada` for names, cut to 31 characters.
pub fn output_sheet_name(key: &SelectionKey) -> String {
    let raw = match key {
        SelectionKey::Position(position) => format!("Aba{position}{CONSOLIDATED_SUFFIX}"),
        SelectionKey::Name(name) => format!("{name}{CONSOLIDATED_SUFFIX}"),
    };
    let truncated = truncate_chars(&sanitize_sheet_name(&raw), MAX_SHEET_NAME_LEN);
    match truncated.trim_matches('\'') {
        "" => FALLBACK_SHEET_NAME.to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']'];
    raw.chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect()
}

/// Hands out unique output sheet names. Sheet names are compared without
/// regard to case, matching how spreadsheet applications treat them.
#[derive(Debug, Default)]
pub struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    /// Returns `name` if unused, otherwise `name` shortened as needed and
    /// suffixed with `_<n>` so that it stays within the length limit.
    pub fn assign(&mut self, name: &str) -> String {
        if self.used.insert(name.to_lowercase()) {
            return name.to_string();
        }

        let mut counter = 1;
        loop {
            let suffix = format!("_{counter}");
            let prefix = truncate_chars(name, MAX_SHEET_NAME_LEN - suffix.len());
            let candidate = format!("{prefix}{suffix}");
            if self.used.insert(candidate.to_lowercase()) {
                warn!(
                    requested = name,
                    assigned = %candidate,
                    "output sheet name collision"
                );
                return candidate;
            }
            counter += 1;
        }
    }
}
