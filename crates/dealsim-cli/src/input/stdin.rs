use serde_json::Value;
use std::io::{self, Read};

/// Piped deal document, or `None` when stdin is a terminal or empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(parse_document(&buffer)?)
}

/// Parse piped text as JSON, then YAML. Only a mapping or a sequence counts
/// as a document; a bare YAML scalar means the input was neither format.
pub fn parse_document(text: &str) -> Result<Option<Value>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let json_error = match serde_json::from_str::<Value>(text) {
        Ok(value) => return Ok(Some(value)),
        Err(e) => e,
    };
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Null) => Ok(None),
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(Some(value)),
        Ok(_) => Err(format!("stdin is not a JSON or YAML document (JSON: {json_error})")),
        Err(yaml_error) => Err(format!(
            "stdin is not a JSON or YAML document (JSON: {json_error}; YAML: {yaml_error})"
        )),
    }
}
