//! Envelope rendering to stdout.

use std::io::Write;

use serde::Serialize;

use crate::error::CliError;

/// Writes `value` as one JSON document followed by a newline.
pub fn render<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value, pretty)
}

/// Writes `value` as a single NDJSON line and flushes, so a consumer sees
/// each update as soon as it is produced.
pub fn render_line<T: Serialize>(value: &T) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value, false)?;
    handle.flush()?;
    Ok(())
}

pub fn write_json<W: Write, T: Serialize>(
    writer: &mut W,
    value: &T,
    pretty: bool,
) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compact_output_is_single_line() {
        let mut buffer = Vec::new();

        write_json(&mut buffer, &json!({"a": [1, 2]}), false).expect("writes");

        assert_eq!(String::from_utf8(buffer).expect("utf8"), "{\"a\":[1,2]}\n");
    }

    #[test]
    fn pretty_output_is_indented() {
        let mut buffer = Vec::new();

        write_json(&mut buffer, &json!({"a": 1}), true).expect("writes");

        assert_eq!(String::from_utf8(buffer).expect("utf8"), "{\n  \"a\": 1\n}\n");
    }
}
