use thiserror::Error;
use unicontract_model::Protocol;

/// Fatal errors that abort normalization of one document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Neither an `openapi`/`swagger` nor an `asyncapi` root field was found.
    #[error("unrecognized spec format: document must have an \"openapi\", \"swagger\" or \"asyncapi\" field")]
    UnrecognizedSpecFormat,

    /// The protocol marker is present but carries no version.
    #[error("{protocol} document is missing its version field")]
    MissingVersionField { protocol: Protocol },

    /// A field the contract cannot be built without is absent.
    #[error("missing required field '{0}'")]
    MissingField(String),

    /// The document has the wrong overall shape.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// A schema, property or header sub-tree could not be read.
///
/// Always recovered where it occurs: the sub-tree degrades to an empty
/// result and a warning is logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A zero-argument accessor reported a failure.
    #[error("accessor '{field}' failed: {reason}")]
    AccessorFailed { field: String, reason: String },

    /// A field resolved to a value of the wrong kind.
    #[error("field '{field}' has unexpected shape: expected {expected}")]
    UnexpectedShape {
        field: String,
        expected: &'static str,
    },

    /// The schema nests deeper than the walker follows.
    #[error("schema nesting exceeds {0} levels")]
    DepthExceeded(usize),

    /// A schema-format handler could not convert a payload.
    #[error("cannot convert {format} schema: {reason}")]
    Conversion {
        format: &'static str,
        reason: String,
    },
}

impl ExtractionError {
    pub fn accessor(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AccessorFailed {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Non-fatal findings reported alongside a successful detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionWarning {
    /// The declared version is outside the supported major versions.
    UnsupportedVersion { protocol: Protocol, version: String },
}

impl std::fmt::Display for VersionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedVersion { protocol, version } => write!(
                f,
                "{} version {} is outside the supported versions",
                protocol, version
            ),
        }
    }
}
