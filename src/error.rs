use std::path::PathBuf;

use thiserror::Error;

/// Failures the navigator reports to its host
#[derive(Debug, Error)]
pub enum NavError {
    /// The archive could not be opened or is not a zip archive
    #[error("cannot read archive {}: {reason}", path.display())]
    ArchiveUnreadable { path: PathBuf, reason: String },

    /// An entry name that does not form a usable path
    #[error("malformed entry name {name:?}")]
    MalformedEntry { name: String },

    /// Extraction stopped partway; files already written are left in place
    #[error("could not open file: extracting {} failed: {reason}", archive.display())]
    ExtractionFailed { archive: PathBuf, reason: String },

    #[error("an extraction is already running for this archive")]
    ExtractionInProgress,

    #[error("no application available for {target}")]
    ViewerUnavailable { target: String },

    #[error("no entry at position {position}")]
    NoSuchEntry { position: usize },
}

pub type NavResult<T> = std::result::Result<T, NavError>;

impl NavError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        NavError::ArchiveUnreadable {
            path: path.into(),
            reason: format!("{:#}", err),
        }
    }

    pub(crate) fn extraction(archive: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        NavError::ExtractionFailed {
            archive: archive.into(),
            reason: format!("{:#}", err),
        }
    }
}
