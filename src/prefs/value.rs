//! Typed preference values and the cleaning rule.
//!
//! Raw values arrive from config files, hooks and CLI overrides as strings,
//! booleans or numbers. [`PrefValue::clean`] resolves them into canonical form:
//!
//! | Raw input              | Canonical            |
//! |------------------------|----------------------|
//! | `"true"` / `true`      | `Bool(true)`         |
//! | `"false"` / `false`    | `Bool(false)`        |
//! | `42` / `"42"` / `"  "` | `Number`             |
//! | anything else          | `String` (verbatim)  |

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single preference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl PrefValue {
    /// Resolve a raw value into its canonical typed form.
    ///
    /// Strings are never unquoted or unescaped: `"\"hi\""` stays a string
    /// with its quotes.
    pub fn clean(self) -> Self {
        match self {
            Self::String(s) => match s.as_str() {
                "true" => Self::Bool(true),
                "false" => Self::Bool(false),
                _ => match js_number(&s) {
                    Some(n) => Self::Number(n),
                    None => Self::String(s),
                },
            },
            other => other,
        }
    }

    /// Runtime type tag used in generated declarations.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }

    /// Render as a literal for a `prefs.js` statement.
    pub fn to_literal(&self) -> String {
        match self {
            Self::String(s) => quote(s),
            other => other.to_string(),
        }
    }
}

/// Bare textual form: strings unquoted, numbers in shortest form.
impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => fmt_number(*n, f),
            Self::String(s) => f.write_str(s),
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if n == 0.0 {
        // -0 renders as 0
        return f.write_str("0");
    }
    write!(f, "{n}")
}

/// Double-quoted literal with JSON escapes.
fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

impl From<bool> for PrefValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PrefValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for PrefValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for PrefValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for PrefValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

// ============================================================================
// Numeric coercion
// ============================================================================

/// Coerce a string to a number the way JavaScript's `Number()` does.
///
/// Differences from `str::parse::<f64>`:
/// - surrounding whitespace is ignored, whitespace-only input is `0`
/// - `Infinity` is spelled out (`inf`/`nan` are rejected)
/// - `0x`, `0o`, `0b` integer prefixes are accepted (unsigned only)
///
/// The empty string is not a number.
pub fn js_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }

    let t = s.trim();
    if t.is_empty() {
        return Some(0.0);
    }

    match t {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    if let Some(n) = radix_literal(t) {
        return n;
    }

    let decimal_chars = t
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !decimal_chars {
        return None;
    }

    t.parse::<f64>().ok()
}

/// Parse `0x`/`0o`/`0b` literals.
///
/// Returns `None` when `t` has no radix prefix, `Some(None)` when the prefix
/// is present but the digits are invalid.
#[allow(clippy::option_option, clippy::cast_precision_loss)]
fn radix_literal(t: &str) -> Option<Option<f64>> {
    let bytes = t.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return None;
    }

    let radix = match bytes[1] {
        b'x' | b'X' => 16,
        b'o' | b'O' => 8,
        b'b' | b'B' => 2,
        _ => return None,
    };

    let digits = &t[2..];
    if digits.is_empty() {
        return Some(None);
    }
    Some(u128::from_str_radix(digits, radix).ok().map(|n| n as f64))
}

// ============================================================================
// Tests
// ============================================================================
