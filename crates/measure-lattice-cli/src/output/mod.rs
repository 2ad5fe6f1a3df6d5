pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Result fields that hold one row per atom, path, node or event, in the
/// order they are preferred as the row set of tabular output.
const ROW_FIELDS: [&str; 8] = [
    "paths",
    "nodes",
    "atoms",
    "levels",
    "elements",
    "conditioning_classes",
    "distributions",
    "terminal_payoffs",
];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The first non-empty array of objects among the known row fields.
pub(crate) fn primary_rows(result: &Map<String, Value>) -> Option<(&'static str, &[Value])> {
    ROW_FIELDS.iter().find_map(|key| match result.get(*key) {
        Some(Value::Array(rows)) if matches!(rows.first(), Some(Value::Object(_))) => {
            Some((*key, rows.as_slice()))
        }
        _ => None,
    })
}
