//! Preference artifacts written after a full build.

use std::fs;

use anyhow::{Context, Result};

use super::BuildContext;
use crate::prefs::{PrefsStore, render_type_declaration};

/// Write `build.prefs.output` and `build.prefs.dts`.
///
/// Values are layered: the `source` file, then configured `values`, then
/// the dev overrides from the build context. The output file carries keys
/// under `prefix`; the type declaration lists them without it.
pub fn write_prefs_artifacts(ctx: &BuildContext<'_>) -> Result<()> {
    let cfg = &ctx.config.build.prefs;
    if cfg.output.is_none() && cfg.dts.is_none() {
        return Ok(());
    }

    let mut store = PrefsStore::new(cfg.namespace);
    if let Some(source) = &cfg.source
        && source.exists()
    {
        store.read(source)?;
    }
    store.set_prefs(cfg.values.iter().map(|(k, v)| (k.clone(), Some(v.clone()))));
    if let Some(overrides) = ctx.overrides {
        store.set_prefs(
            overrides
                .get_prefs()
                .iter()
                .map(|(k, v)| (k.clone(), Some(v.clone()))),
        );
    }

    if let Some(output) = &cfg.output {
        let mut rendered = PrefsStore::new(cfg.namespace);
        match &cfg.prefix {
            Some(prefix) => rendered.extend(store.get_prefs_with_prefix(prefix)),
            None => rendered.extend(store.get_prefs().clone()),
        }
        rendered.write(output)?;
    }

    if let Some(dts) = &cfg.dts {
        let plain = match &cfg.prefix {
            Some(prefix) => store.get_prefs_without_prefix(prefix),
            None => store.get_prefs().clone(),
        };
        if let Some(parent) = dts.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
        fs::write(dts, render_type_declaration(&plain, None))
            .with_context(|| format!("failed to write `{}`", dts.display()))?;
        crate::debug!("prefs"; "wrote {}", dts.display());
    }

    Ok(())
}
