//! Error types shared by the profile loader and the importers.

use std::path::PathBuf;

/// Errors reported by profile selection and document loading.
///
/// Importers never surface these to their callers: they log the error and
/// return an empty result instead.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The file could not be opened or read.
    #[error("cannot read {}: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document parsed but does not have the expected shape.
    #[error("malformed document: {detail}")]
    MalformedDocument { detail: String },

    /// No built-in platform profile has this name.
    #[error("unsupported platform '{0}'")]
    UnsupportedPlatform(String),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ImportError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedDocument { detail: detail.into() }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;

/// Read a whole file, mapping I/O failures to [`ImportError::UnreadableFile`].
pub(crate) fn read_file(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ImportError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })
}
