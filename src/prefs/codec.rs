//! `prefs.js` text codec.
//!
//! # Format
//!
//! ```text
//! pref("extensions.myplugin.enable", true);
//! pref("extensions.myplugin.input", "hello");
//! user_pref("extensions.myplugin.count", 3);
//! ```
//!
//! Parsing is a best-effort line scanner: anything that is not a complete
//! statement (comments, code, half-written lines) is skipped without error.
//! Each line is scanned once from left to right, so crafted input cannot
//! cause super-linear work.

use super::{PrefNamespace, PrefValue, Prefs};

// ============================================================================
// Parse
// ============================================================================

/// Parse all preference statements in `text`.
///
/// Both `pref` and `user_pref` statements are accepted; the caller decides
/// which namespace applies. Later statements for the same key overwrite
/// earlier ones.
pub fn parse(text: &str) -> Prefs {
    let mut prefs = Prefs::new();
    for line in text.lines() {
        if let Some(stmt) = scan_line(line) {
            prefs.insert(stmt.key, decode_value(stmt.raw_value));
        }
    }
    prefs
}

/// A statement matched by the scanner.
#[derive(Debug, PartialEq, Eq)]
struct Statement<'a> {
    namespace: PrefNamespace,
    /// Decoded key.
    key: String,
    raw_value: &'a str,
}

/// Match `ns ( "key" , value ) ;` on a single line.
fn scan_line(line: &str) -> Option<Statement<'_>> {
    let rest = line.trim_start();

    let (namespace, rest) = if let Some(r) = rest.strip_prefix("user_pref") {
        (PrefNamespace::UserPref, r)
    } else if let Some(r) = rest.strip_prefix("pref") {
        (PrefNamespace::Pref, r)
    } else {
        return None;
    };

    let rest = rest.trim_start().strip_prefix('(')?.trim_start();

    // Quoted key: same quote on both ends, backslash escapes skipped
    let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let (raw_key, rest) = split_quoted(&rest[1..], quote)?;
    let key = decode_key(raw_key.trim(), quote);
    if key.is_empty() {
        return None;
    }
    let rest = rest.trim_start().strip_prefix(',')?;

    // Value runs up to the last `)` before the terminating `;`
    let rest = rest.trim_end().strip_suffix(';')?;
    let raw_value = rest.trim_end().strip_suffix(')')?.trim();
    if raw_value.is_empty() {
        return None;
    }

    Some(Statement {
        namespace,
        key,
        raw_value,
    })
}

/// Split at the first unescaped `quote`: `(inner, after_quote)`.
fn split_quoted(text: &str, quote: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some((&text[..i], &text[i + c.len_utf8()..]));
        }
    }
    None
}

/// Decode the inner text of a quoted key.
fn decode_key(inner: &str, quote: char) -> String {
    if quote == '\'' {
        return unescape_single(inner);
    }
    serde_json::from_str::<String>(&format!("\"{inner}\"")).unwrap_or_else(|_| inner.to_owned())
}

/// Decode a value token: string literals are unquoted, bare tokens cleaned.
fn decode_value(raw: &str) -> PrefValue {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        let decoded = serde_json::from_str::<String>(raw)
            .unwrap_or_else(|_| raw[1..raw.len() - 1].to_owned());
        return PrefValue::String(decoded);
    }

    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return PrefValue::String(unescape_single(&raw[1..raw.len() - 1]));
    }

    PrefValue::String(raw.to_owned()).clean()
}

fn unescape_single(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('\'' | '"' | '\\')) => out.push(next),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

// ============================================================================
// Render
// ============================================================================

/// Render `prefs` as statements in insertion order, one per line.
pub fn render(namespace: PrefNamespace, prefs: &Prefs) -> String {
    prefs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}({}, {});",
                namespace.as_str(),
                key_literal(key),
                value.to_literal()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Double-quoted key literal that survives the scanner's key trimming.
///
/// Leading and trailing whitespace is written as `\uXXXX` escapes.
fn key_literal(key: &str) -> String {
    let body = key.trim();
    let start = key.len() - key.trim_start().len();
    let lead = &key[..start];
    let trail = &key[start + body.len()..];

    let escape = |ws: &str| -> String {
        ws.chars()
            .map(|c| format!("\\u{:04x}", u32::from(c)))
            .collect()
    };
    let quoted = PrefValue::from(body).to_literal();

    format!(
        "\"{}{}{}\"",
        escape(lead),
        &quoted[1..quoted.len() - 1],
        escape(trail)
    )
}

/// Render a TypeScript declaration describing the shape of `prefs`.
///
/// With a `prefix`, keys are namespaced the same way as
/// [`PrefsStore::get_prefs_with_prefix`](super::PrefsStore::get_prefs_with_prefix).
pub fn render_type_declaration(prefs: &Prefs, prefix: Option<&str>) -> String {
    let entries: Vec<String> = prefs
        .iter()
        .map(|(key, value)| {
            let key = match prefix {
                Some(p) => super::with_prefix(key, p),
                None => key.clone(),
            };
            format!(
                "{}: {};",
                PrefValue::from(key).to_literal(),
                value.type_name()
            )
        })
        .collect();

    format!(
        r#"// Generated by plugkit
/* prettier-ignore */
/* eslint-disable */
// @ts-nocheck

// prettier-ignore
declare namespace _ZoteroTypes {{
  interface Prefs {{
    PluginPrefsMap: {{
      {}
    }};
  }}
}}
"#,
        entries.join("\n      ")
    )
}

// ============================================================================
// Tests
// ============================================================================
