use crate::load::LoadError;
use crate::settings::SettingsError;
use thiserror::Error;

/// Top-level error type for the rigging library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("load error: {0}")]
    Load(#[from] LoadError),
}
