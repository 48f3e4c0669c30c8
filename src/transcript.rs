//! Session transcript probes.
//!
//! The host writes the conversation as a JSONL file and passes its path in
//! every event. Conditions read it to look for markers in the most recent
//! entries or to count the user prompts submitted so far.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

/// Number of trailing non-empty lines inspected by [`tail_contains`].
pub const TAIL_LINES: usize = 10;

/// A single entry in the transcript JSONL file
#[derive(Debug, Deserialize)]
struct TranscriptEntry {
    #[serde(rename = "type")]
    entry_type: Option<String>,
    message: Option<TranscriptMessage>,
}

#[derive(Debug, Deserialize)]
struct TranscriptMessage {
    content: Option<Value>,
}

/// Expand ~ to home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Check whether one of the last [`TAIL_LINES`] non-empty lines mentions `needle`,
/// either verbatim or inside any string of the parsed entry.
///
/// A missing transcript counts as "not found".
pub fn tail_contains(transcript_path: &Path, needle: &str) -> io::Result<bool> {
    let Some(lines) = lossy_lines(transcript_path)? else {
        return Ok(false);
    };

    let mut last_lines: VecDeque<String> = VecDeque::with_capacity(TAIL_LINES + 1);
    for line in lines {
        let line = line?;
        if !line.trim().is_empty() {
            last_lines.push_back(line);
            if last_lines.len() > TAIL_LINES {
                last_lines.pop_front();
            }
        }
    }

    for line in &last_lines {
        if line.contains(needle) {
            return Ok(true);
        }

        // Escaped characters only match once the line is decoded
        if let Ok(value) = serde_json::from_str::<Value>(line) {
            if contains_text(&value, needle) {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

/// Count user-typed prompts in the transcript. Tool results, which the host
/// also records as `user` entries, are not counted.
pub fn count_user_prompts(transcript_path: &Path) -> io::Result<usize> {
    let Some(lines) = lossy_lines(transcript_path)? else {
        return Ok(0);
    };

    let mut count = 0;
    for line in lines {
        let line = line?;
        let Ok(entry) = serde_json::from_str::<TranscriptEntry>(&line) else {
            continue;
        };
        if entry.entry_type.as_deref() != Some("user") {
            continue;
        }
        if entry
            .message
            .and_then(|msg| msg.content)
            .is_some_and(|content| is_prompt_content(&content))
        {
            count += 1;
        }
    }
    Ok(count)
}

/// Lines of a transcript with invalid UTF-8 replaced. `None` when the file
/// does not exist.
fn lossy_lines(path: &Path) -> io::Result<Option<impl Iterator<Item = io::Result<String>>>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let lines = BufReader::new(file).split(b'\n').map(|line| {
        line.map(|bytes| {
            String::from_utf8_lossy(&bytes)
                .trim_end_matches('\r')
                .to_string()
        })
    });
    Ok(Some(lines))
}

fn is_prompt_content(content: &Value) -> bool {
    match content {
        Value::String(_) => true,
        Value::Array(blocks) => blocks
            .iter()
            .any(|block| block.get("type").and_then(Value::as_str) == Some("text")),
        _ => false,
    }
}

/// Recursively check if any string inside a JSON value contains `needle`
pub fn contains_text(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.contains(needle),
        Value::Array(arr) => arr.iter().any(|v| contains_text(v, needle)),
        Value::Object(obj) => obj.values().any(|v| contains_text(v, needle)),
        _ => false,
    }
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
