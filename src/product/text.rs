//! Text helpers shared by the parsers, the crawl loop and the match layer

use std::collections::HashSet;

/// Upper bound on stored error text, in characters
pub const MAX_ERROR_CHARS: usize = 1200;

/// Collapses every run of whitespace into one space and trims the ends
pub fn normalize_space(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Error text as stored in the database: whitespace-collapsed and truncated
pub fn safe_error(message: &str) -> String {
    normalize_space(message).chars().take(MAX_ERROR_CHARS).collect()
}

/// Removes duplicates while keeping the first occurrence of each value
pub fn dedupe_keep_order<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Extracts the JSON object or array literal assigned after `marker`
///
/// Scans from the first `{` or `[` following the marker to its balanced
/// closing bracket. Brackets inside single- or double-quoted strings are
/// ignored, and backslash escapes inside strings are honored.
pub fn extract_js_value<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    let after_marker = html.find(marker)? + marker.len();
    let rest = &html[after_marker..];
    let start = after_marker + (rest.len() - rest.trim_start().len());

    let bytes = html.as_bytes();
    let open = *bytes.get(start)?;
    let close = match open {
        b'{' => b'}',
        b'[' => b']',
        _ => return None,
    };

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (pos, &ch) in bytes.iter().enumerate().skip(start) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == b'\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            b'"' | b'\'' => quote = Some(ch),
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&html[start..=pos]);
                }
            }
            _ => {}
        }
    }

    None
}
