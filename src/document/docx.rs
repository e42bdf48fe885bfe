use crate::error::DocumentError;
use serde_json::Value;
use std::path::Path;

/// Body paragraphs in order, then table cell paragraphs in order, one per
/// line. Empty paragraphs are skipped.
pub fn extract_docx(path: &Path) -> Result<String, DocumentError> {
    let corrupt = |reason: String| DocumentError::CorruptFile {
        path: path.display().to_string(),
        reason,
    };

    let bytes = std::fs::read(path)?;
    let docx = docx_rs::read_docx(&bytes).map_err(|err| corrupt(format!("{err:?}")))?;
    let parsed: Value =
        serde_json::from_str(&docx.json()).map_err(|err| corrupt(err.to_string()))?;

    let children = parsed["document"]["children"]
        .as_array()
        .ok_or_else(|| corrupt("document has no body".to_string()))?;

    let mut paragraphs = Vec::new();
    let mut cells = Vec::new();
    for child in children {
        walk_block(child, false, &mut paragraphs, &mut cells);
    }

    paragraphs.extend(cells);
    Ok(paragraphs.join("\n"))
}

fn node_type(value: &Value) -> Option<&str> {
    value.get("type").and_then(Value::as_str)
}

fn walk_block(value: &Value, in_table: bool, paragraphs: &mut Vec<String>, cells: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                walk_block(item, in_table, paragraphs, cells);
            }
        }
        Value::Object(map) => match node_type(value) {
            Some("paragraph") => {
                let mut text = String::new();
                collect_text(value, &mut text);
                let text = text.trim();
                if !text.is_empty() {
                    let target = if in_table { &mut *cells } else { &mut *paragraphs };
                    target.push(text.to_string());
                }
            }
            Some("table") => {
                for nested in map.values() {
                    walk_block(nested, true, paragraphs, cells);
                }
            }
            _ => {
                for nested in map.values() {
                    walk_block(nested, in_table, paragraphs, cells);
                }
            }
        },
        _ => {}
    }
}

/// Concatenate every `text` run under `value`.
fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Value::Object(map) => {
            if node_type(value) == Some("text") {
                if let Some(text) = value["data"]["text"].as_str() {
                    out.push_str(text);
                }
                return;
            }
            for nested in map.values() {
                collect_text(nested, out);
            }
        }
        _ => {}
    }
}
