//! Plugin preferences (`prefs.js`).
//!
//! - [`value`]: typed values and the cleaning rule
//! - [`codec`]: text parsing/rendering and type declarations
//! - [`store`]: in-memory store with prefix-scoped views

pub mod codec;
mod store;
mod value;

pub use codec::render_type_declaration;
pub use store::PrefsStore;
pub use value::PrefValue;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Insertion-ordered preference mapping.
pub type Prefs = IndexMap<String, PrefValue>;

/// Statement keyword of a preference file.
///
/// `pref` declares plugin defaults, `user_pref` declares values in a
/// profile's `prefs.js`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefNamespace {
    #[default]
    Pref,
    UserPref,
}

impl PrefNamespace {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pref => "pref",
            Self::UserPref => "user_pref",
        }
    }
}

/// Preference file errors.
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("failed to read preferences from `{0}`")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to write preferences to `{0}`")]
    Write(PathBuf, #[source] std::io::Error),
}

/// Namespace `key` under `prefix` unless it is already there.
pub(crate) fn with_prefix(key: &str, prefix: &str) -> String {
    if key.starts_with(prefix) {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Remove the first `"{prefix}."` found anywhere in `key`.
pub(crate) fn without_prefix(key: &str, prefix: &str) -> String {
    key.replacen(&format!("{prefix}."), "", 1)
}
