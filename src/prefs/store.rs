//! In-memory preference store.

use std::fs;
use std::path::Path;

use super::{PrefNamespace, PrefValue, Prefs, PrefsError, codec, with_prefix, without_prefix};

/// Preferences for one namespace, kept in insertion order.
///
/// Values are stored in canonical form only; assigning `None` removes a key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrefsStore {
    namespace: PrefNamespace,
    prefs: Prefs,
}

impl PrefsStore {
    pub fn new(namespace: PrefNamespace) -> Self {
        Self {
            namespace,
            prefs: Prefs::new(),
        }
    }

    #[cfg(test)]
    pub const fn namespace(&self) -> PrefNamespace {
        self.namespace
    }

    /// Set a single preference, or remove it when `value` is `None`.
    ///
    /// Raw values go through [`PrefValue::clean`]. An existing key keeps its
    /// position.
    pub fn set_pref(&mut self, key: impl Into<String>, value: Option<PrefValue>) {
        let key = key.into();
        match value {
            Some(value) => {
                self.prefs.insert(key, value.clean());
            }
            None => {
                self.prefs.shift_remove(&key);
            }
        }
    }

    /// Apply [`set_pref`](Self::set_pref) for each entry.
    pub fn set_prefs<K, I>(&mut self, prefs: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Option<PrefValue>)>,
    {
        for (key, value) in prefs {
            self.set_pref(key, value);
        }
    }

    /// Insert values that are already canonical (e.g. codec output).
    ///
    /// Unlike [`set_prefs`](Self::set_prefs) nothing is re-cleaned, so a
    /// string `"true"` read from a quoted literal stays a string.
    pub fn extend(&mut self, prefs: Prefs) {
        self.prefs.extend(prefs);
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn get_pref(&self, key: &str) -> Option<&PrefValue> {
        self.prefs.get(key)
    }

    pub const fn get_prefs(&self) -> &Prefs {
        &self.prefs
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn clear_prefs(&mut self) {
        self.prefs.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.prefs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.prefs.is_empty()
    }

    /// Copy of the preferences with every key namespaced under `prefix`.
    ///
    /// Keys that already start with `prefix` are left alone, so applying
    /// this twice is the same as applying it once.
    pub fn get_prefs_with_prefix(&self, prefix: &str) -> Prefs {
        self.prefs
            .iter()
            .map(|(key, value)| (with_prefix(key, prefix), value.clone()))
            .collect()
    }

    /// Copy of the preferences with `"{prefix}."` removed from each key.
    ///
    /// Only the first occurrence is removed, wherever it appears in the key:
    /// `a.ext.b` without `ext` becomes `a.b`.
    pub fn get_prefs_without_prefix(&self, prefix: &str) -> Prefs {
        self.prefs
            .iter()
            .map(|(key, value)| (without_prefix(key, prefix), value.clone()))
            .collect()
    }

    /// Render all preferences in this store's namespace.
    pub fn render(&self) -> String {
        codec::render(self.namespace, &self.prefs)
    }

    /// Read and merge a preference file.
    pub fn read(&mut self, path: &Path) -> Result<(), PrefsError> {
        let content =
            fs::read_to_string(path).map_err(|err| PrefsError::Read(path.to_path_buf(), err))?;
        self.extend(codec::parse(&content));
        Ok(())
    }

    /// Render and write to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), PrefsError> {
        let to_err = |err| PrefsError::Write(path.to_path_buf(), err);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(to_err)?;
        }
        fs::write(path, self.render()).map_err(to_err)?;

        crate::debug!("prefs"; "wrote {}", path.display());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
