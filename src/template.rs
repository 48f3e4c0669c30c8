//! `{query}` placeholder interpolation.
//!
//! Every balanced `{...}` span is a jq query evaluated against the event
//! payload. Two forms are left alone so shell text survives: `${VAR}` and an
//! empty `{}`. A `{` with no matching `}` is literal text.

use serde_json::Value;

use crate::query::QueryCache;

/// Replace every placeholder in `template`. Never fails: a query error is
/// rendered in place as `[JQ_ERROR: <query>: <reason>]`.
pub fn interpolate(queries: &QueryCache, template: &str, data: &Value) -> String {
    if !template.contains('{') {
        return template.to_string();
    }

    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut literal_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'{' || (i > 0 && bytes[i - 1] == b'$') {
            i += 1;
            continue;
        }
        let Some(end) = closing_brace(bytes, i) else {
            i += 1;
            continue;
        };
        let query = template[i + 1..end].trim();
        if query.is_empty() {
            i = end + 1;
            continue;
        }
        out.push_str(&template[literal_start..i]);
        out.push_str(&render_query(queries, query, data));
        literal_start = end + 1;
        i = literal_start;
    }
    out.push_str(&template[literal_start..]);
    out
}

fn render_query(queries: &QueryCache, query: &str, data: &Value) -> String {
    match queries.evaluate(query, data) {
        Ok(values) => values
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join("\n"),
        Err(e) => {
            tracing::debug!(query, error = %e, "placeholder query failed");
            format!("[JQ_ERROR: {query}: {e}]")
        }
    }
}

/// Text form of one query result: strings unquoted, `null` empty,
/// containers as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Index of the `}` closing the `{` at `open`, skipping braces inside jq
/// string literals.
fn closing_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[open..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
