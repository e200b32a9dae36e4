use std::path::{Path, PathBuf};

use thiserror::Error;
use unicontract_normalizer::NormalizeError;

/// A document could not be loaded. Always tied to the document's path.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid YAML or JSON.
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// The document parsed but could not be normalized.
    #[error("failed to normalize {}: {source}", path.display())]
    Normalize {
        path: PathBuf,
        #[source]
        source: NormalizeError,
    },
}

impl LoadError {
    /// Path of the document that failed.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Parse { path, .. } | Self::Normalize { path, .. } => path,
        }
    }
}
