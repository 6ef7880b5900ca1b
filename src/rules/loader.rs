//! Load percept-action rule tables from CSV

use std::fs;
use std::path::Path;

use crate::core::error::{Result, RuleTableError};
use crate::rules::action::Action;
use crate::rules::table::RuleTable;
use crate::simulation::perception::Percept;

/// Percept fields plus at least one action
const MIN_FIELDS: usize = 6;

/// Load a rule table from a CSV file
pub fn load_rule_table(path: &Path) -> Result<RuleTable> {
    let content = fs::read_to_string(path)?;
    let table = parse_rule_table(&content)?;
    tracing::info!(path = %path.display(), rules = table.len(), "Loaded rule table");
    Ok(table)
}

/// Parse rule table text
///
/// Each record is `floor, left, center, right, contact, action1[, action2, ...]`.
/// Blank records and records whose first field starts with `#` are skipped
/// without consuming a rule index. Any bad record rejects the whole table.
pub fn parse_rule_table(content: &str) -> std::result::Result<RuleTable, RuleTableError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut table = RuleTable::new();

    for result in reader.records() {
        let record = result.map_err(|e| RuleTableError::Read(e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.get(0).is_some_and(|f| f.starts_with('#')) {
            continue;
        }

        if record.len() < MIN_FIELDS {
            return Err(RuleTableError::MalformedRecord {
                line,
                reason: format!(
                    "expected at least {} fields, found {}",
                    MIN_FIELDS,
                    record.len()
                ),
            });
        }

        let percept = parse_percept(&record, line)?;
        let actions = parse_actions(&record, line)?;

        table
            .insert(percept, actions)
            .map_err(|first_index| RuleTableError::DuplicateRule {
                line,
                percept: percept.to_string(),
                first_index,
            })?;
    }

    Ok(table)
}

fn parse_percept(
    record: &csv::StringRecord,
    line: u64,
) -> std::result::Result<Percept, RuleTableError> {
    let fields = [0, 1, 2, 3, 4].map(|i| record.get(i).unwrap_or(""));
    Percept::from_fields(fields).map_err(|bad| RuleTableError::InvalidPercept {
        line,
        field: Percept::FIELD_NAMES[bad],
        value: fields[bad].to_string(),
    })
}

/// Empty trailing cells (spreadsheet exports) are ignored
fn parse_actions(
    record: &csv::StringRecord,
    line: u64,
) -> std::result::Result<Vec<Action>, RuleTableError> {
    let actions = record
        .iter()
        .skip(5)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Action::from_symbol(s).ok_or_else(|| RuleTableError::UnknownAction {
                line,
                symbol: s.to_string(),
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if actions.is_empty() {
        return Err(RuleTableError::MalformedRecord {
            line,
            reason: "record has no actions".to_string(),
        });
    }
    Ok(actions)
}
