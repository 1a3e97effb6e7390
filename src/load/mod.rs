//! Layered loading of settings from files, the environment, and raw
//! tables.
//!
//! Sources are merged in registration order, with later sources
//! overriding earlier ones. Nested tables merge recursively; other
//! values (including arrays) are replaced entirely. The merged table is
//! applied to a target instance through
//! [`from_table`](crate::Configurable::from_table), so unknown keys are
//! tolerated and nested children are updated in place.

mod env;
mod error;
mod file;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::settings::Configurable;
pub use error::LoadError;

#[derive(Debug)]
enum Source {
    File { path: PathBuf, required: bool },
    Env { prefix: String, separator: String },
    Table(toml::Table),
}

/// Builder for applying layered settings sources to a
/// [`Configurable`](crate::Configurable).
///
/// ## Example
///
/// ```no_run
/// use rigging::{Loader, Schema};
///
/// let schema = Schema::builder("app")
///     .setting("name", "demo")
///     .required_field("listen")
///     .build();
/// let settings = schema.instantiate();
///
/// // defaults -> env overrides -> local file overrides env
/// Loader::new()
///     .with_file("settings/default.toml", true)
///     .with_env("APP", "__")
///     .with_file("settings/local.toml", false)
///     .apply(&settings)?;
///
/// settings.check_required()?;
/// # Ok::<(), rigging::Error>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "loaders do nothing until .apply() is called"]
pub struct Loader {
    sources: Vec<Source>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a TOML file source.
    ///
    /// If `required` is true, applying fails when the file doesn't
    /// exist; optional files that are missing are silently skipped.
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.sources.push(Source::File {
            path: path.as_ref().to_path_buf(),
            required,
        });
        self
    }

    /// Adds an environment-variable source with the given prefix.
    ///
    /// `PREFIX<sep>SECTION<sep>FIELD=value` overlays `section.field`;
    /// segments lowercase, values coerce to bool/int/float/string.
    pub fn with_env(mut self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        self.sources.push(Source::Env {
            prefix: prefix.into(),
            separator,
        });
        self
    }

    /// Adds an in-memory table source.
    pub fn with_table(mut self, table: toml::Table) -> Self {
        self.sources.push(Source::Table(table));
        self
    }

    /// Merges every source in registration order and assigns the result
    /// onto `target`.
    pub fn apply(self, target: &Configurable) -> Result<(), LoadError> {
        let mut merged = toml::Table::new();

        for source in self.sources {
            match source {
                Source::File { path, required } => {
                    if let Some(table) = file::load_settings_file(&path, required)? {
                        debug!(path = %path.display(), "merging settings file");
                        deep_merge(&mut merged, table);
                    }
                }
                Source::Env { prefix, separator } => {
                    for (path, value) in env::entries(&prefix, &separator) {
                        merge_at_path(&mut merged, &path, value);
                    }
                }
                Source::Table(table) => deep_merge(&mut merged, table),
            }
        }

        target.from_table(&merged);
        Ok(())
    }
}

fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn merge_at_path(table: &mut toml::Table, path: &[String], value: toml::Value) {
    let Some((first, rest)) = path.split_first() else {
        if let toml::Value::Table(overlay) = value {
            deep_merge(table, overlay);
        }
        return;
    };

    if rest.is_empty() {
        match (table.get_mut(first), &value) {
            (Some(toml::Value::Table(base)), toml::Value::Table(overlay)) => {
                deep_merge(base, overlay.clone());
            }
            _ => {
                table.insert(first.clone(), value);
            }
        }
        return;
    }

    if !matches!(table.get(first), Some(toml::Value::Table(_))) {
        table.insert(first.clone(), toml::Value::Table(toml::Table::new()));
    }
    if let Some(toml::Value::Table(nested)) = table.get_mut(first) {
        merge_at_path(nested, rest, value);
    }
}
