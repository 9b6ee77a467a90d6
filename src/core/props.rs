//! Ordered key/value parsing for bnd property files.
//!
//! Handles the property-file subset that bnd descriptors use: `#`/`!`
//! comments, `=`/`:`/whitespace separators, backslash line continuations,
//! and the usual escape sequences. Keys keep their first-seen position;
//! a later assignment overwrites the value, which also gives the
//! overrides-file layering its last-write-wins semantics.

use indexmap::IndexMap;
use std::path::Path;

/// Parsed property file: insertion-ordered, last write wins per key.
pub type Properties = IndexMap<String, String>;

/// Read a property file from disk into `props`, layering over existing keys.
pub fn load_file(path: &Path, props: &mut Properties) -> Result<(), String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    load_str(&content, props);
    Ok(())
}

/// Parse property text into `props`.
pub fn load_str(text: &str, props: &mut Properties) {
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let mut logical = line.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }
        // A trailing unescaped backslash joins the next line, with its
        // leading whitespace stripped.
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }
        let (key, value) = split_key_value(&logical);
        props.insert(unescape(key), unescape(value));
    }
}

fn ends_with_continuation(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Split a logical line at the first unescaped separator.
/// A line with no separator is a key with an empty value.
fn split_key_value(line: &str) -> (&str, &str) {
    let mut iter = line.char_indices();
    let mut split = line.len();
    while let Some((i, c)) = iter.next() {
        match c {
            '\\' => {
                iter.next();
            }
            '=' | ':' | ' ' | '\t' => {
                split = i;
                break;
            }
            _ => {}
        }
    }
    let key = &line[..split];
    let mut rest = line[split..].trim_start();
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start();
    }
    (key, rest)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        // Malformed unicode escape: keep the text as-is.
                        out.push('u');
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
