pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// `{"status": "defined", "value": x}` renders as `x`, undefined as `N/A (reason)`.
pub fn metric_text(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    if map.len() != 2 {
        return None;
    }
    match (map.get("status")?.as_str()?, map.get("value")?) {
        ("defined", Value::String(v)) => Some(v.clone()),
        ("defined", Value::Number(n)) => Some(n.to_string()),
        ("undefined", Value::String(reason)) => Some(format!("N/A ({})", reason)),
        _ => None,
    }
}
