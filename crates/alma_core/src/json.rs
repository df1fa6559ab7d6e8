//! Lenient JSON location in model output.
//!
//! Models wrap JSON in prose, markdown fences and BOMs. These helpers find the
//! object without trusting any of that framing.

use serde::de::DeserializeOwned;

/// Remove a UTF-8 BOM and a surrounding markdown code fence (with or without a
/// language tag). Text without a fence is only trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let text = text.trim_start_matches('\u{feff}').trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag line ("json", "JSON", ...)
        let body = match rest.find('\n') {
            Some(nl) => &rest[nl + 1..],
            None => rest,
        };
        let body = body.trim_end();
        let body = body.strip_suffix("```").unwrap_or(body);
        return body.trim().to_string();
    }
    text.to_string()
}

/// Byte range of the first balanced `{...}` object in `text`.
///
/// Braces inside double-quoted strings are ignored, and backslash escapes
/// inside strings are honoured, so `"a \"}\" b"` does not close the object.
/// If an opening brace never balances, scanning resumes at the next one.
pub fn find_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(rel) = text[search_from..].find('{') {
        let start = search_from + rel;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
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
                        return Some(&text[start..=i]);
                    }
                }
                _ => {}
            }
        }
        search_from = start + 1;
    }
    None
}

/// Decode the first JSON object found in `text` (after fence stripping) as `T`.
pub fn parse_lenient<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
    let cleaned = strip_code_fences(text);
    if let Ok(v) = serde_json::from_str::<T>(&cleaned) {
        return Ok(v);
    }
    let obj = find_json_object(&cleaned)
        .ok_or_else(|| anyhow::anyhow!("no JSON object in model output"))?;
    serde_json::from_str::<T>(obj).map_err(|e| anyhow::anyhow!("invalid JSON object: {}", e))
}
