//! File-based settings source.

use std::path::Path;

use super::LoadError;

/// Loads and parses a TOML settings file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
pub(crate) fn load_settings_file(
    path: &Path,
    required: bool,
) -> Result<Option<toml::Table>, LoadError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = toml::from_str(&contents).map_err(|e| LoadError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(LoadError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(LoadError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
