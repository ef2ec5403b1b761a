//! Flattening of report tables into records.
//!
//! Reports arrive as `{"table": {"cols": [{"label": ..}], "rows": [{"c": [{"v": ..}]}]}}`.

use longboard_types::{LongboardError, Result};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

/// One table row keyed by column label.
pub type Record = BTreeMap<String, String>;

/// Flatten `doc` into one record per row, in input order.
///
/// A missing `table` yields no records. Rows shorter than the headings omit
/// their trailing fields. Malformed rows and cells contribute nothing rather
/// than failing the whole table.
#[must_use]
pub fn normalize(doc: &Value) -> Vec<Record> {
    let Some(table) = doc.get("table") else {
        return Vec::new();
    };
    let headings: Vec<String> = table
        .get("cols")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .map(|c| c.get("label").map(cell_text).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();
    let Some(rows) = table.get("rows").and_then(Value::as_array) else {
        return Vec::new();
    };

    rows.par_iter()
        .enumerate()
        .map(|(i, row)| flatten_row(i, row, &headings))
        .collect()
}

/// Parse `body` and flatten it.
///
/// # Errors
///
/// Returns [`LongboardError::Mapping`] if `body` is not JSON.
pub fn normalize_str(body: &str) -> Result<Vec<Record>> {
    let doc: Value = serde_json::from_str(body)
        .map_err(|e| LongboardError::Mapping(format!("report is not JSON: {e}")))?;
    Ok(normalize(&doc))
}

fn flatten_row(index: usize, row: &Value, headings: &[String]) -> Record {
    let mut record = Record::new();
    let Some(cells) = row.get("c").and_then(Value::as_array) else {
        tracing::warn!(row = index, "skipping malformed report row");
        return record;
    };
    for (heading, cell) in headings.iter().zip(cells) {
        let value = cell.get("v").map(cell_text).unwrap_or_default();
        record.insert(heading.clone(), value);
    }
    record
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
