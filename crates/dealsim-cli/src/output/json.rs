use serde_json::Value;
use std::io::{self, Write};

/// Write `value` as indented JSON followed by a newline.
pub fn write_json<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    out.write_all(b"\n")?;
    out.flush()
}

/// JSON to stdout. A closed pipe (`dealsim ... | head`) ends output quietly.
pub fn print_json(value: &Value) {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    match write_json(&mut lock, value) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
        Err(e) => eprintln!("failed to write JSON output: {e}"),
    }
}
