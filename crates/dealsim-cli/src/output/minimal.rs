use serde_json::Value;

use super::metric_text;

/// Priority list of key output fields
const PRIORITY_KEYS: [&str; 8] = [
    "irr",
    "lp_irr",
    "equity_multiple",
    "net_sale_proceeds",
    "valid",
    "initial_payment",
    "scenarios",
    "saved",
];

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority, first in the
/// result object and then in its `metrics` block, then falls back to the
/// first field.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_text(value));
}

fn minimal_text(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        let nested = map.get("metrics").and_then(Value::as_object);
        for scope in std::iter::once(map).chain(nested) {
            for key in &PRIORITY_KEYS {
                if let Some(val) = scope.get(*key) {
                    if !val.is_null() {
                        return format_minimal(val);
                    }
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_minimal(val));
        }
    }

    format_minimal(result_obj)
}

fn format_minimal(value: &Value) -> String {
    if let Some(text) = metric_text(value) {
        return text;
    }
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefers_irr_inside_metrics() {
        let out = json!({
            "result": {
                "exit": {"sale_price": "300000"},
                "metrics": {"irr": {"status": "defined", "value": "0.0712"}}
            }
        });
        assert_eq!(minimal_text(&out), "0.0712");
    }

    #[test]
    fn test_falls_back_to_first_field() {
        let out = json!({"result": {"deleted": "duplex-a"}});
        assert_eq!(minimal_text(&out), "deleted: duplex-a");
    }
}
