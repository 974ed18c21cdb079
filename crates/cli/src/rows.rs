//! Row files: one JSON object per line.

use std::io::BufRead;

use servingstore::{Row, ServeError, ServeResult};

/// Parse every non-blank line of `input` as a row.
///
/// Fails on the first line that is not a flat JSON object, naming the line.
pub fn read_rows<R: BufRead>(input: R) -> ServeResult<Vec<Row>> {
    let mut rows = Vec::new();
    for (n, line) in input.lines().enumerate() {
        let line = line.map_err(|e| ServeError::invalid_input(format!("line {}: {}", n + 1, e)))?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Row = serde_json::from_str(&line)
            .map_err(|e| ServeError::invalid_input(format!("line {}: {}", n + 1, e)))?;
        rows.push(row);
    }
    Ok(rows)
}
