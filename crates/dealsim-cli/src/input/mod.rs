pub mod file;
pub mod settings;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Deserialise from `--input`, else piped stdin, else fail with `missing`.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
    missing: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        file::read_document(path)
    } else if let Some(data) = stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err(missing.to_string().into())
    }
}
